/// Integration tests: end-to-end scenarios, persistence backends and the
/// JSON-RPC server loop
mod persistence;
mod scenarios;
mod server;
