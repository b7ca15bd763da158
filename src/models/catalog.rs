//! Hierarchy derived from object keys of the form `device/operation/file`.
//!
//! Nothing here is stored: devices, operations and image roles are all
//! recomputed from key strings on every request.

use serde::Serialize;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '/';

/// First segment of an object key, if non-empty.
pub fn device_of(key: &str) -> Option<&str> {
    key.split(KEY_SEPARATOR).next().filter(|s| !s.is_empty())
}

/// Operation segment of a key already known to live under `device_prefix`
/// (`"<device>/"`).
///
/// The second segment, whether or not more segments follow: `d1/op1/a.png`
/// and `d1/op1` both yield `op1`. An empty second segment yields nothing.
pub fn operation_of<'k>(key: &'k str, device_prefix: &str) -> Option<&'k str> {
    let rest = key.strip_prefix(device_prefix)?;
    rest.split(KEY_SEPARATOR).next().filter(|s| !s.is_empty())
}

/// Prefix under which a device's objects live.
pub fn device_prefix(device_id: &str) -> String {
    format!("{device_id}{KEY_SEPARATOR}")
}

/// Prefix under which an operation's objects live.
pub fn operation_prefix(device_id: &str, operation_id: &str) -> String {
    format!("{device_id}{KEY_SEPARATOR}{operation_id}{KEY_SEPARATOR}")
}

/// Role an image plays within an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Before,
    After,
}

impl ImageRole {
    pub const ALL: [ImageRole; 2] = [ImageRole::Before, ImageRole::After];

    fn token(self) -> &'static str {
        match self {
            ImageRole::Before => "before",
            ImageRole::After => "after",
        }
    }

    /// Roles whose token appears in `file_name`, ignoring case. The name is
    /// lowercased once for all roles.
    pub fn classify(file_name: &str) -> Vec<ImageRole> {
        let lowered = file_name.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|role| lowered.contains(role.token()))
            .collect()
    }
}

/// Signed URLs for the before/after images of one operation.
///
/// Serializes as `{"before": ..., "after": ...}` with `null` for a role
/// that had no matching object.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ImagePair {
    /// Signed URL of the image taken before the operation.
    pub before: Option<String>,

    /// Signed URL of the image taken after the operation.
    pub after: Option<String>,
}

impl ImagePair {
    pub fn set(&mut self, role: ImageRole, url: String) {
        match role {
            ImageRole::Before => self.before = Some(url),
            ImageRole::After => self.after = Some(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_is_first_non_empty_segment() {
        assert_eq!(device_of("d1/op1/before.png"), Some("d1"));
        assert_eq!(device_of("d1"), Some("d1"));
        assert_eq!(device_of("/op1/before.png"), None);
        assert_eq!(device_of(""), None);
    }

    #[test]
    fn operation_is_the_second_non_empty_segment() {
        let prefix = device_prefix("d1");
        assert_eq!(operation_of("d1/op1/before.png", &prefix), Some("op1"));
        assert_eq!(operation_of("d1/op1/nested/after.png", &prefix), Some("op1"));
        assert_eq!(operation_of("d1/op1", &prefix), Some("op1"));
        assert_eq!(operation_of("d1/readme.txt", &prefix), Some("readme.txt"));
        assert_eq!(operation_of("d1/", &prefix), None);
        assert_eq!(operation_of("d1//before.png", &prefix), None);
        assert_eq!(operation_of("d1", &prefix), None);
        assert_eq!(operation_of("d2/op1/before.png", &prefix), None);
    }

    #[test]
    fn roles_match_case_insensitively() {
        assert_eq!(ImageRole::classify("BEFORE_cut.PNG"), vec![ImageRole::Before]);
        assert_eq!(ImageRole::classify("img-After.jpg"), vec![ImageRole::After]);
        assert!(ImageRole::classify("overview.png").is_empty());
    }

    #[test]
    fn one_file_may_carry_both_roles() {
        assert_eq!(
            ImageRole::classify("Before_And_AFTER.png"),
            vec![ImageRole::Before, ImageRole::After]
        );
    }

    #[test]
    fn empty_pair_serializes_nulls() {
        let json = serde_json::to_value(ImagePair::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "before": null, "after": null }));
    }
}
