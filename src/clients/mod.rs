pub mod management_client;

pub use management_client::ManagementClient;
