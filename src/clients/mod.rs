pub mod compile_client;

pub use compile_client::CompileClient;
