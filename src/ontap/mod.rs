//! ONTAP REST plumbing: a small blocking client and the CIFS share ACL
//! gateway built on it.

pub mod client;
pub mod error;
pub mod share_acl;

pub use client::{ClientSettings, RestClient};
pub use share_acl::ShareAclGateway;
