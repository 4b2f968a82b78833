// ABOUTME: Straight-line transformation from experiment manifest to SSH config and node lists
// ABOUTME: Parses once, then appends the SSH config and rewrites node_list and addr_list in order

use crate::config::Config;
use crate::manifest::{NodeRecord, parse_manifest};
use crate::output::{write_addr_list, write_node_list};
use crate::ssh::append_host_entries;
use anyhow::Result;
use std::path::Path;

/// Run the transformation described by `config`.
///
/// Side effects happen in a fixed order: SSH config append, `node_list`, `addr_list`.
/// A failure stops the run; files written before it are left in place.
pub fn run(config: &Config) -> Result<Vec<NodeRecord>> {
    let manifest_path = Path::new(&config.manifest.path);
    let records = parse_manifest(manifest_path, &config.ssh.domain_suffix)?;

    if records.is_empty() {
        tracing::warn!("No nodes with a vnode descriptor found in {}", manifest_path.display());
    }
    for record in &records {
        tracing::debug!("{} -> {}", record.identifier, record.address);
    }

    let ssh_config = Path::new(&config.ssh.config_path);
    append_host_entries(ssh_config, &records, &config.ssh.user)?;
    tracing::info!("Appended {} host(s) to {}", records.len(), ssh_config.display());

    let node_list = Path::new(&config.output.node_list);
    let written = write_node_list(node_list, &records)?;
    tracing::info!("Wrote {} node name(s) to {}", written, node_list.display());

    let addr_list = Path::new(&config.output.addr_list);
    let written = write_addr_list(addr_list, &records)?;
    tracing::info!("Wrote {} address(es) to {}", written, addr_list.display());

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ManifestConfig, OutputConfig, SshConfig};
    use std::fs;
    use tempfile::TempDir;

    const EXAMPLE_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rspec xmlns="http://www.geni.net/resources/rspec/3"
       xmlns:emulab="http://www.protogeni.net/resources/rspec/ext/emulab/1"
       type="manifest">
  <node client_id="node0" exclusive="true">
    <sliver_type name="raw-pc"/>
    <emulab:vnode name="pc1" hardware_type="d430"/>
  </node>
  <node client_id="node1" exclusive="true">
    <sliver_type name="raw-pc"/>
  </node>
  <node client_id="node2" exclusive="true">
    <emulab:vnode name="pc3"/>
    <emulab:vnode name="pc4"/>
  </node>
</rspec>
"#;

    fn create_test_config(temp_dir: &TempDir, manifest: &str) -> Config {
        let dir = temp_dir.path();
        let manifest_path = dir.join("manifest.xml");
        fs::write(&manifest_path, manifest).unwrap();
        fs::create_dir(dir.join(".ssh")).unwrap();

        Config {
            manifest: ManifestConfig {
                path: manifest_path.to_string_lossy().to_string(),
            },
            ssh: SshConfig {
                config_path: dir.join(".ssh").join("config").to_string_lossy().to_string(),
                user: "junzhig".to_string(),
                domain_suffix: ".utah.cloudlab.us".to_string(),
            },
            output: OutputConfig {
                node_list: dir.join("node_list").to_string_lossy().to_string(),
                addr_list: dir.join("addr_list").to_string_lossy().to_string(),
            },
        }
    }

    fn read(path: &str) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_run_writes_all_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir, EXAMPLE_MANIFEST);

        let records = run(&config).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(read(&config.output.node_list), "node0\nnode2\n");
        assert_eq!(
            read(&config.output.addr_list),
            "pc1.utah.cloudlab.us\npc3.utah.cloudlab.us\n"
        );
        assert_eq!(
            read(&config.ssh.config_path),
            "Host node0\n   HostName pc1.utah.cloudlab.us\n   User junzhig\n\
             Host node2\n   HostName pc3.utah.cloudlab.us\n   User junzhig\n"
        );
    }

    #[test]
    fn test_node_and_addr_lists_line_up() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir, EXAMPLE_MANIFEST);

        let records = run(&config).unwrap();

        let nodes = read(&config.output.node_list);
        let addrs = read(&config.output.addr_list);
        assert_eq!(nodes.lines().count(), records.len());
        assert_eq!(addrs.lines().count(), records.len());
        for ((node, addr), record) in nodes.lines().zip(addrs.lines()).zip(&records) {
            assert_eq!(node, record.identifier);
            assert_eq!(addr, record.address);
        }
    }

    #[test]
    fn test_run_twice_appends_ssh_config_only() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir, EXAMPLE_MANIFEST);

        run(&config).unwrap();
        let nodes_first = read(&config.output.node_list);
        let addrs_first = read(&config.output.addr_list);
        let ssh_first = read(&config.ssh.config_path);

        run(&config).unwrap();

        assert_eq!(read(&config.output.node_list), nodes_first);
        assert_eq!(read(&config.output.addr_list), addrs_first);
        let ssh_second = read(&config.ssh.config_path);
        assert_eq!(ssh_second.lines().count(), 2 * ssh_first.lines().count());
    }

    #[test]
    fn test_run_with_custom_user_and_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir, EXAMPLE_MANIFEST);
        config.ssh.user = "alice".to_string();
        config.ssh.domain_suffix = ".wisc.cloudlab.us".to_string();

        run(&config).unwrap();

        assert!(read(&config.ssh.config_path).contains("   User alice\n"));
        assert_eq!(
            read(&config.output.addr_list),
            "pc1.wisc.cloudlab.us\npc3.wisc.cloudlab.us\n"
        );
    }

    #[test]
    fn test_run_empty_manifest_truncates_lists() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(
            &temp_dir,
            r#"<rspec xmlns="http://www.geni.net/resources/rspec/3"/>"#,
        );
        fs::write(&config.output.node_list, "old\n").unwrap();

        let records = run(&config).unwrap();

        assert!(records.is_empty());
        assert_eq!(read(&config.output.node_list), "");
        assert_eq!(read(&config.output.addr_list), "");
        assert_eq!(read(&config.ssh.config_path), "");
    }

    #[test]
    fn test_run_missing_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir, EXAMPLE_MANIFEST);
        config.manifest.path = temp_dir.path().join("absent.xml").to_string_lossy().to_string();

        let result = run(&config);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read manifest"));
        assert!(!Path::new(&config.ssh.config_path).exists());
        assert!(!Path::new(&config.output.node_list).exists());
    }

    #[test]
    fn test_run_malformed_manifest_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir, "<rspec><node client_id=\"a\"></rspec>");

        let result = run(&config);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse manifest"));
        assert!(!Path::new(&config.ssh.config_path).exists());
        assert!(!Path::new(&config.output.addr_list).exists());
    }

    #[test]
    fn test_run_missing_ssh_directory_stops_before_lists() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir, EXAMPLE_MANIFEST);
        config.ssh.config_path = temp_dir
            .path()
            .join("no-such-dir")
            .join("config")
            .to_string_lossy()
            .to_string();

        let result = run(&config);

        assert!(result.is_err());
        assert!(!Path::new(&config.output.node_list).exists());
        assert!(!Path::new(&config.output.addr_list).exists());
    }

    #[test]
    fn test_run_unwritable_addr_list_keeps_earlier_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir, EXAMPLE_MANIFEST);
        config.output.addr_list = temp_dir
            .path()
            .join("no-such-dir")
            .join("addr_list")
            .to_string_lossy()
            .to_string();

        let result = run(&config);

        assert!(result.is_err());
        assert_eq!(read(&config.output.node_list), "node0\nnode2\n");
        assert!(read(&config.ssh.config_path).contains("Host node2\n"));
    }
}
