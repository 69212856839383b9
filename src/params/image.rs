// ABOUTME: Image and registry option bags built from raw request fields.
// ABOUTME: Applies tag defaults, repository composition, and save/load path checks.

use std::path::{Path, PathBuf};

use super::error::ParamError;
use super::raw::RawParameters;
use crate::engine::RegistryAuth;
use crate::types::ImageRef;

pub const DEFAULT_TAG: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    pub auth: RegistryAuth,
}

impl TryFrom<&RawParameters> for LoginOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            auth: RegistryAuth {
                username: raw.required_non_blank("login_user")?,
                // Passwords are taken verbatim; whitespace may be significant.
                password: raw.required_string("login_pass")?,
                server: raw.non_blank("registry_srv")?,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub term: String,
}

impl TryFrom<&RawParameters> for SearchOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            term: raw.required_non_blank("keyword")?,
        })
    }
}

/// Pull `[repo/]name:tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOptions {
    pub image: ImageRef,
    pub tag: String,
}

impl TryFrom<&RawParameters> for PullOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        let name = raw.required_non_blank("image_name")?;
        let image = match raw.non_blank("repo_name")? {
            Some(repo) => ImageRef::in_repository(&repo, &name),
            None => ImageRef::parse(&name),
        }
        .map_err(|e| ParamError::invalid("image_name", e.to_string()))?;

        Ok(Self {
            image,
            tag: raw
                .non_blank("image_tag")?
                .unwrap_or_else(|| DEFAULT_TAG.to_string()),
        })
    }
}

/// An image addressed by ID or reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub image: ImageRef,
}

impl TryFrom<&RawParameters> for ImageTarget {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            image: image_id(raw)?,
        })
    }
}

fn image_id(raw: &RawParameters) -> Result<ImageRef, ParamError> {
    let id = raw.required_non_blank("image_id")?;
    ImageRef::parse(&id).map_err(|e| ParamError::invalid("image_id", e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveImageOptions {
    pub image: ImageRef,
    pub force: bool,
}

impl TryFrom<&RawParameters> for RemoveImageOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            image: image_id(raw)?,
            force: raw.flag("force").resolve(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOptions {
    pub image: ImageRef,
    pub repository: String,
    pub tag: Option<String>,
    pub force: bool,
}

impl TryFrom<&RawParameters> for TagOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            image: image_id(raw)?,
            repository: raw.required_non_blank("repo_name")?,
            tag: raw.non_blank("tag_name")?,
            force: raw.flag("force").resolve(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOptions {
    pub repository: String,
    pub tag: Option<String>,
    /// Credentials for this push only; they are not cached.
    pub auth: Option<RegistryAuth>,
}

impl TryFrom<&RawParameters> for PushOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        let user = raw.non_blank("login_user")?;
        let pass = raw.string("login_pass")?;
        let auth = match (user, pass) {
            (Some(username), Some(password)) => Some(RegistryAuth {
                username,
                password,
                server: raw.non_blank("registry_srv")?,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ParamError::Missing("login_pass")),
            (None, Some(_)) => return Err(ParamError::Missing("login_user")),
        };
        Ok(Self {
            repository: raw.required_non_blank("repo_name")?,
            tag: raw.non_blank("image_tag")?,
            auth,
        })
    }
}

/// Export an image to `save_path/tarball_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub image: ImageRef,
    pub directory: PathBuf,
    pub tarball_name: String,
}

impl SaveOptions {
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.tarball_name)
    }

    /// `<image>_<unix-timestamp>.tar`, with path and tag separators flattened.
    pub fn default_tarball_name(image: &ImageRef, timestamp: i64) -> String {
        let stem: String = image
            .as_str()
            .chars()
            .map(|c| if matches!(c, '/' | ':' | '\\') { '_' } else { c })
            .collect();
        format!("{}_{}.tar", stem, timestamp)
    }
}

impl TryFrom<&RawParameters> for SaveOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        let name = raw.required_non_blank("image_name")?;
        let image =
            ImageRef::parse(&name).map_err(|e| ParamError::invalid("image_name", e.to_string()))?;

        let directory = PathBuf::from(raw.required_non_blank("save_path")?);
        if !directory.is_dir() {
            return Err(ParamError::PathNotFound("save_path"));
        }

        let tarball_name = match raw.non_blank("tarball_name")? {
            Some(name) => {
                validate_file_name(&name)?;
                name
            }
            None => Self::default_tarball_name(&image, chrono::Utc::now().timestamp()),
        };

        Ok(Self {
            image,
            directory,
            tarball_name,
        })
    }
}

/// The tarball must land inside `save_path`.
fn validate_file_name(name: &str) -> Result<(), ParamError> {
    let path = Path::new(name);
    let single_component = path.components().count() == 1
        && path.file_name().is_some_and(|f| f == name)
        && !name.contains('/')
        && !name.contains('\\');
    if single_component {
        Ok(())
    } else {
        Err(ParamError::invalid(
            "tarball_name",
            "must be a file name without directory components",
        ))
    }
}

/// Import a tarball as a new image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub tarball: PathBuf,
    pub repository: String,
    pub tag: Option<String>,
    pub changes: Option<String>,
}

impl TryFrom<&RawParameters> for LoadOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        let tarball = PathBuf::from(raw.required_non_blank("tarball_name")?);
        if !tarball.is_file() {
            return Err(ParamError::PathNotFound("tarball_name"));
        }
        Ok(Self {
            tarball,
            repository: raw.required_non_blank("image_name")?,
            tag: raw.non_blank("image_tag")?,
            changes: raw.non_blank("changes")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_requires_user_and_password() {
        let raw = RawParameters::from([("login_user", json!("alice"))]);
        assert_eq!(
            LoginOptions::try_from(&raw),
            Err(ParamError::Missing("login_pass"))
        );
        let raw = raw.with("login_pass", json!("s3cret"));
        let options = LoginOptions::try_from(&raw).unwrap();
        assert_eq!(options.auth.server, None);
    }

    #[test]
    fn pull_defaults_tag_to_latest() {
        let raw = RawParameters::from([("image_name", json!("nginx"))]);
        let options = PullOptions::try_from(&raw).unwrap();
        assert_eq!(options.image.as_str(), "nginx");
        assert_eq!(options.tag, "latest");
    }

    #[test]
    fn pull_composes_repository() {
        let raw = RawParameters::from([
            ("image_name", json!("nginx")),
            ("repo_name", json!("myorg")),
            ("image_tag", json!("  ")),
        ]);
        let options = PullOptions::try_from(&raw).unwrap();
        assert_eq!(options.image.as_str(), "myorg/nginx");
        assert_eq!(options.tag, "latest");
    }

    #[test]
    fn tag_requires_image_and_repository() {
        let raw = RawParameters::from([("image_id", json!("sha256:abc"))]);
        assert_eq!(
            TagOptions::try_from(&raw),
            Err(ParamError::Missing("repo_name"))
        );
        let options = TagOptions::try_from(&raw.with("repo_name", json!("me/app"))).unwrap();
        assert!(!options.force);
        assert_eq!(options.tag, None);
    }

    #[test]
    fn push_auth_override_needs_both_halves() {
        let raw = RawParameters::from([("repo_name", json!("me/app")), ("login_user", json!("u"))]);
        assert_eq!(
            PushOptions::try_from(&raw),
            Err(ParamError::Missing("login_pass"))
        );
        let options = PushOptions::try_from(&raw.with("login_pass", json!("p"))).unwrap();
        assert_eq!(options.auth.unwrap().username, "u");
    }

    #[test]
    fn default_tarball_name_flattens_separators() {
        let image = ImageRef::parse("myorg/nginx:1.25").unwrap();
        assert_eq!(
            SaveOptions::default_tarball_name(&image, 1_700_000_000),
            "myorg_nginx_1.25_1700000000.tar"
        );
    }

    #[test]
    fn save_rejects_missing_directory() {
        let raw = RawParameters::from([
            ("image_name", json!("x")),
            ("save_path", json!("/definitely/not/here")),
        ]);
        assert_eq!(
            SaveOptions::try_from(&raw),
            Err(ParamError::PathNotFound("save_path"))
        );
    }

    #[test]
    fn save_rejects_escaping_tarball_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../x.tar", "a/b.tar", ".."] {
            let raw = RawParameters::from([
                ("image_name", json!("x")),
                ("save_path", json!(dir.path().to_str().unwrap())),
                ("tarball_name", json!(name)),
            ]);
            assert!(SaveOptions::try_from(&raw).is_err(), "{name}");
        }
    }

    #[test]
    fn load_blank_optionals_become_unset() {
        let dir = tempfile::tempdir().unwrap();
        let tarball = dir.path().join("img.tar");
        std::fs::write(&tarball, b"tar").unwrap();
        let raw = RawParameters::from([
            ("tarball_name", json!(tarball.to_str().unwrap())),
            ("image_name", json!("repo/img")),
            ("image_tag", json!(" ")),
            ("changes", json!("")),
        ]);
        let options = LoadOptions::try_from(&raw).unwrap();
        assert_eq!(options.tag, None);
        assert_eq!(options.changes, None);
    }

    #[test]
    fn load_rejects_missing_tarball() {
        let raw = RawParameters::from([
            ("tarball_name", json!("/no/such/file.tar")),
            ("image_name", json!("repo/img")),
        ]);
        assert_eq!(
            LoadOptions::try_from(&raw),
            Err(ParamError::PathNotFound("tarball_name"))
        );
    }
}
