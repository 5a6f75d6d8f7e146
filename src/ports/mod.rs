//! Port traits defining external boundaries.
//!
//! Each trait is one boundary between the publish pipeline and something it
//! does not own: time, ids, disk, the cipher, the relational store, the wiki,
//! the knowledge base, the revision directory and the text normalizer.
//! Implementations live in `src/adapters/`.

pub mod cipher;
pub mod clock;
pub mod credentials;
pub mod edit;
pub mod filesystem;
pub mod id_gen;
pub mod link;
pub mod pages;
pub mod reports;
pub mod revisions;
pub mod text;

pub use cipher::{Cipher, KeyContext};
pub use clock::Clock;
pub use credentials::{CredentialPair, CredentialStore, EncryptedPair, Generation, PrincipalRow};
pub use edit::{EditRequest, EditService};
pub use filesystem::FileSystem;
pub use id_gen::IdGenerator;
pub use link::{LinkService, SiteLinkRequest, TOKEN_FAILURE};
pub use pages::{PageStore, PageTarget, TargetTable};
pub use reports::{AuditRecord, ReportRow, ReportTable};
pub use revisions::RevisionDirectory;
pub use text::TextNormalizer;
