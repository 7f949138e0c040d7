//! Levantamento de cargas: camada de aplicação da CLI
//!
//! A parte de planilha (análise de modelo, exportação, pacote com
//! fotos) vive no crate `levantamento-common`; aqui ficam sessão,
//! armazenamento, autenticação, modelos e envio por e-mail.

pub mod auth;
pub mod cli;
pub mod config;
pub mod email;
pub mod error;
pub mod photos;
pub mod session;
pub mod store;
pub mod template;
