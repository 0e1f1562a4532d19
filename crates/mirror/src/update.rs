use crate::release::ReleaseDescriptor;

/// Answer to a client's "is there something newer than my version" query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub update_available: bool,
    pub latest_version: String,
    pub release_notes: String,
    pub download_url: String,
}

fn normalize(version: &str) -> &str {
    let version = version.trim();
    version.strip_prefix('v').unwrap_or(version)
}

/// Compare the client's version against the current release.
///
/// Comparison is lexical on the strings with one leading `v` removed, so
/// `"9" > "10"`. Only same-width versions compare as a human would expect.
pub fn check_update(
    client_version: &str,
    current: &ReleaseDescriptor,
    download_url: &str,
) -> UpdateCheck {
    let latest = normalize(&current.tag);
    let client = normalize(client_version);

    UpdateCheck {
        update_available: latest != client && latest > client,
        latest_version: current.tag.clone(),
        release_notes: current.notes.clone(),
        download_url: download_url.to_owned(),
    }
}
