//! Label-indexed photo search.
//!
//! Object-store notifications drive two handlers: [`indexer::IndexingHandler`]
//! labels new images through a vision oracle and upserts one document per
//! object, and [`deleter::DeletionHandler`] removes documents for deleted
//! objects. [`photo_search::SearchHandler`] answers label queries with
//! short-lived access URLs. All search-store traffic goes through the signed
//! [`search::SearchTransport`].

pub mod batch;
pub mod config;
pub mod deleter;
pub mod document;
pub mod error;
pub mod indexer;
pub mod labels;
pub mod notification;
pub mod photo_search;
pub mod search;
pub mod search_clients;
pub mod storage;
pub mod web_server;
