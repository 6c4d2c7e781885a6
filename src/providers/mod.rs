pub mod iex_cloud;

pub use iex_cloud::IexCloudProvider;
