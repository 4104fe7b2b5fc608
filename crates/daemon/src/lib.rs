pub mod lifecycle;
pub mod router;
pub mod server;
pub mod tools;

pub use lifecycle::{
  Daemon, DaemonConfig, LifecycleError, default_data_dir, is_running, pid_file_path, remove_pid_file, write_pid_file,
};
pub use router::{Request, Response, Router, RpcError};
pub use server::{Client, Server, ServerError, ShutdownHandle, default_socket_path};
pub use tools::ToolHandler;
