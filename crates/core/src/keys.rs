//! Object storage key layout.

/// Serialized canvas state for one version.
pub fn canvas_state_key(canvas_id: &str, version: &str) -> String {
    format!("state/{canvas_id}/{version}")
}

pub fn document_key(doc_id: &str) -> String {
    format!("doc/{doc_id}.txt")
}

pub fn resource_key(resource_id: &str) -> String {
    format!("resources/{resource_id}.txt")
}

/// Raw upload of a resource; keeps the original file name (last path segment).
pub fn resource_raw_key(resource_id: &str, source_raw_key: &str) -> String {
    format!("static/{resource_id}/{}", file_name(source_raw_key))
}

pub fn code_artifact_key(artifact_id: &str) -> String {
    format!("code-artifact/{artifact_id}")
}

pub fn drive_file_key(uid: &str, canvas_id: &str, file_id: &str, name: &str) -> String {
    format!("drive/{uid}/{canvas_id}/{file_id}-{}", file_name(name))
}

/// Public JSON blob of a share record.
pub fn share_key(share_id: &str) -> String {
    format!("share/{share_id}.json")
}

/// Share-scoped copy of a drive file.
pub fn share_file_key(share_id: &str, file_id: &str, name: &str) -> String {
    format!("share/{share_id}/files/{file_id}-{}", file_name(name))
}

/// Share-scoped copy of an entity's raw content (resource uploads).
pub fn share_raw_key(share_id: &str, source_raw_key: &str) -> String {
    format!("share/{share_id}/raw/{}", file_name(source_raw_key))
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_key_keeps_file_name() {
        assert_eq!(
            resource_raw_key("r-2", "static/r-1/report.pdf"),
            "static/r-2/report.pdf"
        );
    }

    #[test]
    fn drive_key_strips_directories_from_name() {
        assert_eq!(
            drive_file_key("u-1", "c-1", "df-1", "a/b/photo.png"),
            "drive/u-1/c-1/df-1-photo.png"
        );
    }

    #[test]
    fn share_keys_are_scoped_by_share_id() {
        assert_eq!(share_key("can-1"), "share/can-1.json");
        assert!(share_file_key("can-1", "df-1", "x.txt").starts_with("share/can-1/"));
    }
}
