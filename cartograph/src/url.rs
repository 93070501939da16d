//! Canonical resource addressing, including the virtual `zip://` scheme used
//! to address entries inside an in-memory archive.

use crate::error::CartographError;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::fmt;

const ZIP_SCHEME: &str = "zip";

/// An immutable, canonically-formed resource identifier.
///
/// Wraps the `url` crate's own `Url`, adding the virtual `zip://<percent
/// encoded archive url>/<entry path>` addressing scheme that lets an archive
/// entry be named the same way any other resource is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url(url::Url);

impl Url {
    /// Parses an absolute URL string.
    pub fn parse(input: &str) -> Result<Self, CartographError> {
        Ok(Self(url::Url::parse(input)?))
    }

    /// Resolves `relative` against this URL, RFC-3986 style.
    pub fn resolve(&self, relative: &str) -> Result<Self, CartographError> {
        Ok(Self(self.0.join(relative)?))
    }

    /// The URL's canonical string form.
    pub fn string(&self) -> String {
        self.0.to_string()
    }

    /// The scheme component (`http`, `file`, `zip`, ...).
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// The extension of the last path segment, lowercased, if any.
    pub fn path_extension(&self) -> Option<String> {
        let segment = self.0.path_segments()?.next_back()?;
        let (_, ext) = segment.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }

    /// True if this URL's path extension indicates a zip archive.
    pub fn is_zip_archive(&self) -> bool {
        self.path_extension().as_deref() == Some("zip")
    }

    /// Builds the `zip://` URL addressing `entry_path` inside the archive
    /// located at `archive`.
    pub fn entry_url_for(archive: &Url, entry_path: &str) -> Result<Url, CartographError> {
        let encoded_host = escape_reserved(&archive.string());
        let raw = format!("{ZIP_SCHEME}://{encoded_host}/{}", entry_path.trim_start_matches('/'));
        Url::parse(&raw)
    }

    /// Recovers the archive's own URL from one of its `zip://` entry URLs.
    pub fn archive_url_for_entry(&self) -> Result<Url, CartographError> {
        self.require_zip_scheme()?;
        let host = self.0.host_str().ok_or_else(|| {
            CartographError::InvalidUrl(format!("{}: zip url has no archive host", self.string()))
        })?;
        let decoded = unescape_reserved(host)?;
        Url::parse(&decoded)
    }

    /// The entry path addressed by a `zip://` URL, without its leading slash.
    pub fn entry_path(&self) -> Result<String, CartographError> {
        self.require_zip_scheme()?;
        Ok(self.0.path().trim_start_matches('/').to_string())
    }

    /// Converts a `file://` URL to a local filesystem path.
    pub fn to_file_path(&self) -> Result<std::path::PathBuf, CartographError> {
        self.0
            .to_file_path()
            .map_err(|()| CartographError::InvalidUrl(format!("{}: not a valid file url", self.string())))
    }

    fn require_zip_scheme(&self) -> Result<(), CartographError> {
        if self.scheme() != ZIP_SCHEME {
            return Err(CartographError::InvalidUrl(format!(
                "{}: expected a zip:// url",
                self.string()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Percent-encodes every byte outside `[A-Za-z0-9]`, for embedding an
/// arbitrary string (such as an archive's own URL) inside a URL component.
pub fn escape_reserved(input: &str) -> String {
    utf8_percent_encode(input, NON_ALPHANUMERIC).to_string()
}

/// Inverse of [`escape_reserved`].
pub fn unescape_reserved(input: &str) -> Result<String, CartographError> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .map_err(|err| CartographError::InvalidUrl(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_path() {
        let base = Url::parse("https://example.com/styles/root.yaml").unwrap();
        let resolved = base.resolve("../textures/icon.png").unwrap();
        assert_eq!(resolved.string(), "https://example.com/textures/icon.png");
    }

    #[test]
    fn path_extension_is_lowercased() {
        let url = Url::parse("https://example.com/data/TILES.ZIP").unwrap();
        assert_eq!(url.path_extension().as_deref(), Some("zip"));
        assert!(url.is_zip_archive());
    }

    #[test]
    fn zip_entry_round_trips_to_archive_url() {
        let archive = Url::parse("https://example.com/data/world.zip").unwrap();
        let entry = Url::entry_url_for(&archive, "styles/base.yaml").unwrap();
        assert_eq!(entry.scheme(), "zip");
        assert_eq!(entry.entry_path().unwrap(), "styles/base.yaml");
        assert_eq!(entry.archive_url_for_entry().unwrap(), archive);
    }

    #[test]
    fn resolution_is_associative_for_relative_references() {
        let base = Url::parse("https://example.com/a/b/").unwrap();
        let a = "c/";
        let b = "d.yaml";

        let left = base.resolve(a).unwrap().resolve(b).unwrap();
        let right = base.resolve(&format!("{a}{b}")).unwrap();
        assert_eq!(left, right);
    }
}
