use super::*;
use crate::media::blob::{FileRejection, FileRejectionReason};

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SlotreelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(SlotreelError::stage("x").to_string().contains("stage error:"));
    assert!(
        SlotreelError::render("x")
            .to_string()
            .contains("render error:")
    );
    assert!(
        SlotreelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn upload_rejection_converts_and_lists_files() {
    let err: SlotreelError = UploadRejection::InvalidFiles(vec![
        FileRejection {
            file_name: "a.gif".to_string(),
            reason: FileRejectionReason::InvalidFormat,
        },
        FileRejection {
            file_name: "b.mp4".to_string(),
            reason: FileRejectionReason::TooLarge {
                size_bytes: 200,
                limit_bytes: 100,
            },
        },
    ])
    .into();
    let msg = err.to_string();
    assert!(msg.starts_with("upload rejected:"));
    assert!(msg.contains("a.gif"));
    assert!(msg.contains("b.mp4"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SlotreelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
