// ABOUTME: SSH client configuration module for registering experiment nodes as host aliases
// ABOUTME: Renders Host/HostName/User blocks and appends them without touching existing entries

pub mod writer;

pub use writer::append_host_entries;
