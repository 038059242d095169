pub mod cache;
pub mod path;
pub mod permissions;
pub mod resolver;
pub mod resource;

pub use cache::ResourceCache;
pub use path::VirtualPath;
pub use permissions::{RoleScope, resolve};
pub use resolver::PathResolver;
pub use resource::{Permissions, Resource, ResourceKind};
