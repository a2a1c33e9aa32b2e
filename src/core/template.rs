//! Department path templates
//!
//! Templates are written with `/` separators and resolved relative to a
//! shot root. A working-area template may contain an `{owner}` segment;
//! everything before it is the base under which owner directories live, and
//! everything after it is the render root inside each owner's area. Without
//! the placeholder the whole template is the owner base and the render root
//! defaults to `renders/preview`.

use std::path::{Path, PathBuf};

pub const OWNER_PLACEHOLDER: &str = "{owner}";
pub const DEFAULT_RENDER_SUBPATH: &str = "renders/preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    base: Vec<String>,
    per_owner: Vec<String>,
    has_owner: bool,
}

fn segments(text: &str) -> Vec<String> {
    text.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .map(str::to_string)
        .collect()
}

fn join_segments(root: &Path, segs: &[String]) -> PathBuf {
    let mut path = root.to_path_buf();
    for seg in segs {
        path.push(seg);
    }
    path
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Self {
        match raw.find(OWNER_PLACEHOLDER) {
            Some(idx) => {
                let (before, rest) = raw.split_at(idx);
                let after = &rest[OWNER_PLACEHOLDER.len()..];
                Self {
                    raw: raw.to_string(),
                    base: segments(before),
                    per_owner: segments(after),
                    has_owner: true,
                }
            }
            None => Self {
                raw: raw.to_string(),
                base: segments(raw),
                per_owner: segments(DEFAULT_RENDER_SUBPATH),
                has_owner: false,
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn has_owner_placeholder(&self) -> bool {
        self.has_owner
    }

    /// Directory under which owner directories are enumerated
    pub fn owner_base(&self, shot_root: &Path) -> PathBuf {
        join_segments(shot_root, &self.base)
    }

    /// Render root for one owner: the directory holding render-name directories
    pub fn owner_render_root(&self, shot_root: &Path, owner: &str) -> PathBuf {
        let mut path = self.owner_base(shot_root);
        path.push(owner);
        join_segments(&path, &self.per_owner)
    }

    /// Resolve the template as a plain directory (publish templates)
    pub fn resolve(&self, shot_root: &Path) -> PathBuf {
        if self.has_owner {
            // A publish location has no owner; resolve to the base only.
            return self.owner_base(shot_root);
        }
        join_segments(shot_root, &self.base)
    }
}
