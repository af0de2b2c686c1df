pub mod identity_documents;
