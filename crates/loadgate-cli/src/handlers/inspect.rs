//! Inspect command handler

use crate::{CliResult, InspectArgs};
use loadgate::classfile::access;
use loadgate::ClassHeader;
use std::fmt::Write as _;

const FLAG_NAMES: &[(u16, &str)] = &[
    (access::ACC_PUBLIC, "public"),
    (access::ACC_FINAL, "final"),
    (access::ACC_SUPER, "super"),
    (access::ACC_INTERFACE, "interface"),
    (access::ACC_ABSTRACT, "abstract"),
    (access::ACC_SYNTHETIC, "synthetic"),
];

fn flag_list(flags: u16) -> String {
    let names: Vec<_> = FLAG_NAMES
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(" ")
    }
}

/// Render a header as text, or JSON when `json` is set
pub fn render_header(header: &ClassHeader, json: bool) -> CliResult<String> {
    if json {
        return Ok(serde_json::to_string_pretty(header)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "class:      {}", header.this_class);
    let _ = writeln!(
        out,
        "super:      {}",
        header.super_class.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "version:    {}.{}",
        header.major_version, header.minor_version
    );
    let _ = writeln!(
        out,
        "access:     0x{:04x} ({})",
        header.access_flags,
        flag_list(header.access_flags)
    );
    let _ = writeln!(out, "interfaces: {}", header.interfaces.len());
    let _ = writeln!(out, "fields:     {}", header.field_count);
    let _ = writeln!(out, "methods:    {}", header.methods.len());
    for method in &header.methods {
        let _ = writeln!(out, "  {}{}", method.name, method.descriptor);
    }
    Ok(out)
}

/// Execute the inspect command
pub fn execute_inspect(args: &InspectArgs) -> CliResult<String> {
    let bytes = std::fs::read(&args.file)?;
    let header = ClassHeader::parse(&bytes)?;
    render_header(&header, args.json)
}
