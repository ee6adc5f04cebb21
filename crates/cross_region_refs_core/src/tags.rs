//! Strong-reference tags placed on exported parameters by their readers.

pub const STRONG_REF_TAG_PREFIX: &str = "aws-cdk:strong-ref:";
pub const STRONG_REF_TAG_VALUE: &str = "true";

/// Parameter path under which exports are written.
pub const EXPORT_PATH_PREFIX: &str = "/cdk/exports/";

pub fn strong_ref_tag_key(prefix: &str) -> String {
    format!("{STRONG_REF_TAG_PREFIX}{prefix}")
}

/// Whether `name` is a parameter path the writer owns.
pub fn is_export_parameter(name: &str) -> bool {
    name.strip_prefix(EXPORT_PATH_PREFIX)
        .is_some_and(|leaf| !leaf.trim().is_empty())
}

/// Owner named by a strong-reference tag key, if the key is one.
pub fn referencing_stack(tag_key: &str) -> Option<&str> {
    tag_key
        .strip_prefix(STRONG_REF_TAG_PREFIX)
        .filter(|owner| !owner.is_empty())
}
