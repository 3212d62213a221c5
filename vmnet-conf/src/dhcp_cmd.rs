use anyhow::Result;
use vmnet_conf::report::render_declarations;
use vmnet_conf::settings::{Settings, SettingsKey};
use vmnet_conf_core::{read_dhcp_config, ConfigDeclaration};

use crate::cli::{DhcpArgs, OutputFormat};

pub fn run_dhcp(args: DhcpArgs, settings: &Settings) -> Result<()> {
    let path = crate::input_path(settings, args.file.as_deref(), SettingsKey::DhcpdConf)?;
    let config = crate::parse_input(&path, read_dhcp_config)?;

    let selected: Vec<&ConfigDeclaration> = if let Some(address) = args.subnet {
        vec![config.subnet_by_address(address)?]
    } else if let Some(host) = &args.host {
        vec![config.host_by_name(host)?]
    } else if args.global {
        vec![config.global()]
    } else {
        config.iter().collect()
    };

    match args.format {
        OutputFormat::Text => println!("{}", render_declarations(selected)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&selected)?),
    }
    Ok(())
}
