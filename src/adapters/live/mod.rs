//! Live adapters for real external interactions.

pub mod cipher;
pub mod clock;
pub mod edit;
pub mod filesystem;
pub mod id_gen;
pub mod link;
pub mod mediawiki;
pub mod revisions;
pub mod sqlite;
pub mod text;
