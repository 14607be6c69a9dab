//! Network collaborators: trait boundaries for HTTP, SMTP, and TLS, plus
//! a minimal in-memory transport sufficient for tests and demos. None of
//! these are production protocol stacks — a hosting system that needs real
//! wire compatibility swaps in its own implementation behind the same
//! traits.

pub mod http;
pub mod smtp;
pub mod ssl;

pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use smtp::{Mailer, Message};
pub use ssl::TlsConfig;
