//! The check every handler runs before touching an owned resource.
//!
//! A missing resource and a resource owned by someone else are reported
//! differently: the first as 404, the second as 403.

use crate::entity::{artist, playlist, song};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotFound,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(Denial),
}

/// Decide whether `identity` may act on a resource owned by `resource_owner`
/// (`None` when the resource does not exist).
pub fn authorize(identity: i32, resource_owner: Option<i32>) -> Access {
    match resource_owner {
        None => Access::Deny(Denial::NotFound),
        Some(owner) if owner != identity => Access::Deny(Denial::Forbidden),
        Some(_) => Access::Allow,
    }
}

/// Anything with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> i32;
}

impl Owned for song::Model {
    fn owner_id(&self) -> i32 {
        self.user_id
    }
}

impl Owned for playlist::Model {
    fn owner_id(&self) -> i32 {
        self.user_id
    }
}

impl Owned for artist::Model {
    fn owner_id(&self) -> i32 {
        self.user_id
    }
}

/// What the client is told a denied resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Song,
    Playlist,
    Artist,
    Cover,
}

impl ResourceKind {
    fn denied(self, denial: Denial) -> AppError {
        let noun = match self {
            ResourceKind::Song => "song",
            ResourceKind::Playlist => "playlist",
            ResourceKind::Artist => "artist",
            ResourceKind::Cover => "cover",
        };
        match denial {
            Denial::NotFound => AppError::NotFound(format!("{} not found", capitalize(noun))),
            Denial::Forbidden => AppError::Forbidden(format!("Not your {noun}")),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Run [`authorize`] and turn a denial into the matching error.
pub fn require_owner<T: Owned>(
    identity: i32,
    resource: Option<T>,
    kind: ResourceKind,
) -> Result<T, AppError> {
    let owner = resource.as_ref().map(Owned::owner_id);
    match (authorize(identity, owner), resource) {
        (Access::Allow, Some(resource)) => Ok(resource),
        (Access::Deny(denial), _) => Err(kind.denied(denial)),
        (Access::Allow, None) => Err(kind.denied(Denial::NotFound)),
    }
}
