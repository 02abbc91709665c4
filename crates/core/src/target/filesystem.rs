//! Publication target writing to a local directory.

use crate::collection::Collection;
use crate::resource::PersistentResource;
use crate::target::{PublicationTarget, TargetError};
use brs_files::PublicationArea;
use brs_ident::Sha1Hash;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A target which publishes resources to a directory in the local
/// filesystem, typically one served by a web server.
///
/// Published files land under a path derived from the resource's content
/// hash and filename, so the same content published under two filenames
/// yields two distinct public files. When a resource carries an explicit
/// relative publication path, that path wins over the hash-derived one.
#[derive(Debug)]
pub struct FileSystemTarget {
    name: String,
    area: PublicationArea,
    base_uri: String,
    subdivide_hash_path_segment: bool,
    extension_blacklist: BTreeSet<String>,
}

impl FileSystemTarget {
    /// Opens a filesystem target publishing into `path`, addressed under
    /// `base_uri`.
    ///
    /// The publication directory is created if missing. `base_uri` gets a
    /// trailing slash appended when it lacks one.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Initialisation`] if the publication directory
    /// cannot be created.
    pub fn new(name: &str, path: &Path, base_uri: &str) -> Result<Self, TargetError> {
        let area = PublicationArea::open(path).map_err(|e| TargetError::Initialisation {
            target: name.to_owned(),
            reason: e.to_string(),
        })?;

        let mut base_uri = base_uri.to_owned();
        if !base_uri.is_empty() && !base_uri.ends_with('/') {
            base_uri.push('/');
        }

        Ok(Self {
            name: name.to_owned(),
            area,
            base_uri,
            subdivide_hash_path_segment: true,
            extension_blacklist: BTreeSet::new(),
        })
    }

    /// Disables or enables the subdivision of the hash path segment.
    ///
    /// With subdivision on (the default), content is published under
    /// `c/8/2/8/<sha1>/<filename>`; with it off, under `<sha1>/<filename>`.
    pub fn with_subdivided_hash_path(mut self, subdivide: bool) -> Self {
        self.subdivide_hash_path_segment = subdivide;
        self
    }

    /// Sets the list of filename extensions this target refuses to publish.
    pub fn with_extension_blacklist<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extension_blacklist = extensions
            .into_iter()
            .map(|extension| extension.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// Determines the relative publication location for a piece of content.
    ///
    /// An explicit relative publication path wins; otherwise the location is
    /// derived from the content hash. A missing filename falls back to the
    /// hash itself so the location never ends in a bare directory.
    fn relative_location(
        &self,
        sha1: &Sha1Hash,
        filename: &str,
        relative_publication_path: &str,
    ) -> String {
        let filename = if filename.is_empty() {
            sha1.as_str()
        } else {
            filename
        };

        if !relative_publication_path.is_empty() {
            let trimmed = relative_publication_path.trim_matches('/');
            return format!("{}/{}", trimmed, filename);
        }

        if self.subdivide_hash_path_segment {
            let hash = sha1.as_str();
            format!(
                "{}/{}/{}/{}/{}/{}",
                &hash[0..1],
                &hash[1..2],
                &hash[2..3],
                &hash[3..4],
                hash,
                filename
            )
        } else {
            format!("{}/{}", sha1.as_str(), filename)
        }
    }

    fn ensure_extension_allowed(&self, filename: &str) -> Result<(), TargetError> {
        let extension = brs_types::file_extension(filename).to_ascii_lowercase();
        if !extension.is_empty() && self.extension_blacklist.contains(&extension) {
            return Err(TargetError::BlacklistedExtension {
                target: self.name.clone(),
                filename: filename.to_owned(),
                extension,
            });
        }
        Ok(())
    }

    fn resource_location(&self, resource: &PersistentResource) -> Result<String, TargetError> {
        let sha1 = resource.sha1().ok_or_else(|| TargetError::MissingContentHash {
            target: self.name.clone(),
        })?;
        Ok(self.relative_location(
            sha1,
            resource.filename(),
            resource.relative_publication_path(),
        ))
    }

    fn uri_for_location(&self, location: &str) -> String {
        let encoded: Vec<String> = location.split('/').map(encode_uri_segment).collect();
        format!("{}{}", self.base_uri, encoded.join("/"))
    }

    /// Returns the publication directory root.
    #[must_use]
    pub fn publication_root(&self) -> &Path {
        self.area.root()
    }
}

impl PublicationTarget for FileSystemTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish_resource(
        &self,
        resource: &PersistentResource,
        collection: &Collection,
    ) -> Result<(), TargetError> {
        self.ensure_extension_allowed(resource.filename())?;
        let location = self.resource_location(resource)?;

        let mut stream =
            collection
                .stream_by_resource(resource)
                .ok_or_else(|| TargetError::MissingData {
                    target: self.name.clone(),
                    sha1: resource
                        .sha1()
                        .map(|hash| hash.to_string())
                        .unwrap_or_else(|| "-".to_owned()),
                    filename: resource.filename().to_owned(),
                })?;

        self.area
            .publish_stream(&mut stream, &PathBuf::from(&location))
            .map_err(|e| TargetError::Publication {
                target: self.name.clone(),
                path: location.clone(),
                cause: Box::new(e),
            })?;

        tracing::debug!(
            "published file to target '{}' at '{}'",
            self.name,
            location
        );
        Ok(())
    }

    fn publish_collection(&self, collection: &Collection) -> Result<(), TargetError> {
        for object in collection.objects() {
            self.ensure_extension_allowed(&object.filename)?;

            let Some(mut stream) = object.open() else {
                tracing::warn!(
                    "could not publish '{}' (SHA-1 {}) of collection '{}': no corresponding data in the storage",
                    object.filename,
                    object.sha1,
                    collection.name()
                );
                continue;
            };

            let location = self.relative_location(
                &object.sha1,
                &object.filename,
                &object.relative_publication_path,
            );
            self.area
                .publish_stream(&mut stream, &PathBuf::from(&location))
                .map_err(|e| TargetError::Publication {
                    target: self.name.clone(),
                    path: location,
                    cause: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn unpublish_resource(&self, resource: &PersistentResource) -> Result<(), TargetError> {
        let location = self.resource_location(resource)?;
        self.area
            .unpublish(&PathBuf::from(&location))
            .map_err(|e| TargetError::Publication {
                target: self.name.clone(),
                path: location,
                cause: Box::new(e),
            })
    }

    fn public_persistent_resource_uri(
        &self,
        resource: &PersistentResource,
    ) -> Result<String, TargetError> {
        let location = self.resource_location(resource)?;
        Ok(self.uri_for_location(&location))
    }

    fn public_static_resource_uri(&self, relative_path: &str) -> String {
        self.uri_for_location(relative_path.trim_matches('/'))
    }
}

/// Percent-encodes one path segment for use in a URI.
///
/// Unreserved characters pass through; everything else becomes `%XX`.
fn encode_uri_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}
