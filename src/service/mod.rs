//! Service layer: lifecycle managers, access resolution, identity extraction
//! and the background retention worker.

pub mod access;
pub mod document_service;
pub mod gc_worker;
pub mod identity;
pub mod image_service;
