//! Purchase order attachment checks.

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Leading bytes of every PDF file (`%PDF`).
pub const PDF_SIGNATURE: [u8; 4] = [0x25, 0x50, 0x44, 0x46];

/// Why an attachment was refused.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("no purchase order attached")]
    Missing,

    #[error("purchase order is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("purchase order does not start with the PDF signature")]
    Signature,

    #[error("purchase order is {size} bytes; must be under {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Decode a base64 attachment and check it looks like a PDF smaller than
/// `limit` bytes.
///
/// # Errors
///
/// Returns the first `PdfError` that applies.
pub fn decode_purchase_order(encoded: Option<&str>, limit: usize) -> Result<Vec<u8>, PdfError> {
    let encoded = encoded.ok_or(PdfError::Missing)?;
    let bytes = STANDARD.decode(encoded.trim())?;
    check_purchase_order(&bytes, limit)?;
    Ok(bytes)
}

/// Signature and size checks on already-decoded bytes.
///
/// # Errors
///
/// Returns `PdfError::Signature` or `PdfError::TooLarge`.
pub fn check_purchase_order(bytes: &[u8], limit: usize) -> Result<(), PdfError> {
    if !bytes.starts_with(&PDF_SIGNATURE) {
        return Err(PdfError::Signature);
    }
    if bytes.len() >= limit {
        return Err(PdfError::TooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LIMIT: usize = 64;

    fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_accepts_small_pdf() {
        let encoded = encode(b"%PDF-1.7\n...");
        let bytes = decode_purchase_order(Some(&encoded), LIMIT).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_rejects_wrong_signature_regardless_of_size() {
        for payload in [&[0_u8, 0, 0, 0][..], b"%PD", b"", b"PDF%-1.4"] {
            assert!(matches!(
                decode_purchase_order(Some(&encode(payload)), LIMIT),
                Err(PdfError::Signature)
            ));
        }
    }

    #[test]
    fn test_size_ceiling_is_exclusive() {
        let mut at_limit = PDF_SIGNATURE.to_vec();
        at_limit.resize(LIMIT, b' ');
        assert!(matches!(
            check_purchase_order(&at_limit, LIMIT),
            Err(PdfError::TooLarge { size: 64, limit: 64 })
        ));

        at_limit.pop();
        assert!(check_purchase_order(&at_limit, LIMIT).is_ok());
    }

    #[test]
    fn test_missing_and_malformed() {
        assert!(matches!(
            decode_purchase_order(None, LIMIT),
            Err(PdfError::Missing)
        ));
        assert!(matches!(
            decode_purchase_order(Some("not base64!"), LIMIT),
            Err(PdfError::Encoding(_))
        ));
    }
}
