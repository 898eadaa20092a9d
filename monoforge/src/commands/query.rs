//! Workspace inspection commands.

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde_json::json;

use crate::formatting::{print_heading, print_result, print_warning, Status};

use super::Workspace;

pub fn cmd_list(root: &Path, dev: bool, json: bool) -> Result<bool> {
    let ws = Workspace::load(root)?;
    let registry = ws.registry();
    let mut detector = ws.detector(&registry)?;
    let report = detector.classify_all(&ws.graph)?;

    if json {
        let entries: Vec<_> = ws
            .graph
            .packages()
            .map(|pkg| {
                let state = report
                    .state(&pkg.name)
                    .map(|s| s.as_str().to_string())
                    .or_else(|| report.failure(&pkg.name).map(|e| format!("error: {}", e)));
                json!({
                    "name": pkg.name,
                    "version": pkg.version.to_string(),
                    "path": pkg.path,
                    "state": state,
                    "dependencies": pkg.dependency_names(dev).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(!report.has_failures());
    }

    print_heading("Packages");
    for pkg in ws.graph.packages() {
        let deps: Vec<&str> = pkg.dependency_names(dev).collect();
        let name_version = format!("{} {}", pkg.name, pkg.version.to_string().dimmed());

        if let Some(err) = report.failure(&pkg.name) {
            print_result(Status::Error, &name_version, &err.to_string());
            continue;
        }
        let state = report.state(&pkg.name);
        let status = match state {
            Some(s) if s.is_modified() => Status::Warning,
            _ => Status::Success,
        };
        let label = state.map(|s| s.as_str()).unwrap_or("unknown");
        let detail = if deps.is_empty() {
            label.to_string()
        } else {
            format!("{} ({})", label, deps.join(", "))
        };
        print_result(status, &name_version, &detail);
    }
    println!();

    if report.has_failures() {
        print_warning("some packages could not be classified");
        println!();
        return Ok(false);
    }
    Ok(true)
}
