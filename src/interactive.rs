use crate::server::{Liveness, ServerBackend};
use anyhow::Result;
use std::io::{BufRead, Write};

/// One row of the selection menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRow {
    pub name: String,
    pub liveness: Option<Liveness>,
    pub selected: bool,
}

/// Query every server once so the menu can show UP/DOWN.
pub fn status_rows<B: ServerBackend>(backend: &B) -> Result<Vec<ServerRow>> {
    let rows = backend
        .list_servers()?
        .into_iter()
        .map(|name| {
            let liveness = match backend.liveness(&name) {
                Ok(l) => Some(l),
                Err(e) => {
                    log::warn!("Could not query {}: {:#}", name, e);
                    None
                }
            };
            ServerRow {
                name,
                liveness,
                selected: false,
            }
        })
        .collect();
    Ok(rows)
}

fn print_table<W: Write>(rows: &[ServerRow], out: &mut W) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "Servers:")?;
    writeln!(out, "#\tName\t\tUP/DOWN\tCheck")?;
    for (i, row) in rows.iter().enumerate() {
        let liveness = row
            .liveness
            .map(|l| l.to_string())
            .unwrap_or_else(|| "?".to_string());
        writeln!(
            out,
            "{}\t{}\t\t{}\t{}",
            i,
            row.name,
            liveness,
            if row.selected { "[x]" } else { "[ ]" }
        )?;
    }
    writeln!(out, "Select servers to Monitor(#) / (Done)")?;
    write!(out, ">")?;
    out.flush()?;
    Ok(())
}

/// Run the selection menu until the user types `done` with at least one
/// server marked. Returns the marked names in list order.
pub fn select_servers<R: BufRead, W: Write>(
    mut rows: Vec<ServerRow>,
    mut input: R,
    mut out: W,
) -> Result<Vec<String>> {
    if rows.is_empty() {
        return Err(anyhow::anyhow!("No servers available to monitor"));
    }

    loop {
        print_table(&rows, &mut out)?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(anyhow::anyhow!("Input closed before any server was selected"));
        }
        let choice = line.trim();

        if choice.eq_ignore_ascii_case("done") || choice.eq_ignore_ascii_case("d") {
            if rows.iter().any(|r| r.selected) {
                break;
            }
            writeln!(out, "Select at least one server first")?;
            continue;
        }

        match choice.parse::<usize>() {
            Ok(i) if i < rows.len() => rows[i].selected = true,
            Ok(i) => writeln!(out, "No server #{}", i)?,
            Err(_) => {
                if !choice.is_empty() {
                    writeln!(out, "Enter a server number or Done")?;
                }
            }
        }
    }

    Ok(rows
        .into_iter()
        .filter(|r| r.selected)
        .map(|r| r.name)
        .collect())
}
