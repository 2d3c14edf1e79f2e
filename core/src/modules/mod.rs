//! Reference implementations of the collaborator ports.
//!
//! Each module is self-contained and replaceable. The controller never sees
//! these types directly, only the traits in `reconr_common::ports`.

mod discovery;
mod external;
mod portscan;
mod resolver;
mod whois;

pub use discovery::WordlistDiscovery;
pub use external::ExternalCommand;
pub use portscan::TcpConnectScanner;
pub use resolver::SystemResolver;
pub use whois::WhoisClient;
