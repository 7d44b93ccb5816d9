//! A dot/graphviz rendering of the history DAG. Pure view: it only
//! reads the reference table and commit metadata and emits text.

use std::collections::HashMap;

use crate::commit::CommitId;
use crate::error::Result;
use crate::history;
use crate::refs::RefTable;
use crate::Repository;

const SHORT_ID: usize = 8;

/// Renders the commit graph reachable from HEAD as a dot digraph.
/// Branch tips are seeded as labelled edges; without `all` only master
/// is shown, and only while it points at HEAD.
pub fn render(repo: &Repository, all: bool) -> Result<String> {
    let Some(table) = RefTable::load_opt(repo)? else {
        return Ok("digraph wit {\n}\n".to_string());
    };

    let mut seeds: Vec<(String, CommitId)> = vec![("HEAD".to_string(), table.head.clone())];
    if all {
        seeds.push(("master".to_string(), table.master.clone()));
        for (name, id) in table.branches() {
            seeds.push((name.to_string(), id.clone()));
        }
    } else if table.master == table.head {
        seeds.push(("master".to_string(), table.master.clone()));
    }

    let mut parents: HashMap<CommitId, Vec<CommitId>> = HashMap::new();
    for (_, tip) in &seeds {
        parents.extend(history::parent_map(repo, tip)?);
    }

    let mut out = String::from("digraph wit {\n");
    let mut ids: Vec<&CommitId> = parents.keys().collect();
    ids.sort();
    for id in &ids {
        out.push_str(&format!(
            "    \"{id}\" [label=\"{}\"]\n",
            &id.as_str()[..SHORT_ID]
        ));
    }
    for (name, tip) in &seeds {
        out.push_str(&format!("    \"{name}\" -> \"{tip}\"\n"));
    }
    for id in &ids {
        for parent in &parents[*id] {
            out.push_str(&format!("    \"{id}\" -> \"{parent}\"\n"));
        }
    }
    out.push_str("}\n");
    Ok(out)
}
