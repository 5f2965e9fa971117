use crate::error::{ExplorerError, Result};
use crate::tree::DocRefNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Everything collaborators can ask the engine to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // Server data
    DocTreeReceived {
        tree: DocRefNode,
    },
    DocRefTypesReceived {
        types: Vec<String>,
    },

    // View lifecycle and configuration
    ExplorerOpened {
        view_id: String,
        #[serde(default)]
        allow_multi_select: bool,
        #[serde(default)]
        allow_drag_and_drop: bool,
        #[serde(default)]
        type_filters: BTreeSet<String>,
    },
    ExplorerClosed {
        view_id: String,
    },
    TypeFilterChanged {
        view_id: String,
        doc_type: String,
        included: bool,
    },
    TypeFiltersSelectAll {
        view_id: String,
        included: bool,
    },
    SearchTermChanged {
        view_id: String,
        search_term: String,
    },

    // Interaction
    FolderToggled {
        view_id: String,
        uuid: String,
    },
    NodeSelected {
        view_id: String,
        uuid: String,
        #[serde(default)]
        append_selection: bool,
        #[serde(default)]
        contiguous_selection: bool,
    },
    ContextMenuOpened {
        view_id: String,
        uuid: String,
    },
    ContextMenuClosed {
        view_id: String,
    },

    // Structural commands
    NodeCreated {
        parent_uuid: String,
        node: DocRefNode,
    },
    NodeRenamed {
        uuid: String,
        name: String,
    },
    NodesDeleted {
        uuids: Vec<String>,
    },
    NodesMoved {
        uuids: Vec<String>,
        destination_uuid: String,
    },
    NodesCopied {
        uuids: Vec<String>,
        destination_uuid: String,
    },

    Sequence {
        actions: Vec<Action>,
    },
}

impl Action {
    /// Commands that change the canonical tree
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Action::DocTreeReceived { .. }
                | Action::NodeCreated { .. }
                | Action::NodeRenamed { .. }
                | Action::NodesDeleted { .. }
                | Action::NodesMoved { .. }
                | Action::NodesCopied { .. }
        )
    }

    /// Parse a JSON action or the compact `verb:arg:arg` form
    pub fn from_string(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('{') {
            return Ok(serde_json::from_str(s)?);
        }

        let (verb, rest) = s.split_once(':').unwrap_or((s, ""));
        let args: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(':').collect()
        };
        let arg = |index: usize| -> Result<String> {
            args.get(index)
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
                .ok_or_else(|| invalid(s, &format!("missing argument {}", index + 1)))
        };
        let flags = |from: usize| args.iter().skip(from).copied().collect::<BTreeSet<&str>>();

        match verb.to_lowercase().as_str() {
            "types" => Ok(Action::DocRefTypesReceived {
                types: split_list(rest),
            }),
            "open" => {
                let mut type_filters = BTreeSet::new();
                for flag in args.iter().skip(1) {
                    if let Some(list) = flag.strip_prefix("filter=") {
                        type_filters.extend(split_list(list));
                    } else if !matches!(*flag, "multi" | "dnd") {
                        return Err(invalid(s, &format!("unknown open flag '{}'", flag)));
                    }
                }
                let flags = flags(1);
                Ok(Action::ExplorerOpened {
                    view_id: arg(0)?,
                    allow_multi_select: flags.contains("multi"),
                    allow_drag_and_drop: flags.contains("dnd"),
                    type_filters,
                })
            }
            "close" => Ok(Action::ExplorerClosed { view_id: arg(0)? }),
            "search" => Ok(Action::SearchTermChanged {
                view_id: arg(0)?,
                search_term: args.get(1..).map(|rest| rest.join(":")).unwrap_or_default(),
            }),
            "filter" => Ok(Action::TypeFilterChanged {
                view_id: arg(0)?,
                doc_type: arg(1)?,
                included: parse_switch(s, &arg(2)?)?,
            }),
            "filter_all" => Ok(Action::TypeFiltersSelectAll {
                view_id: arg(0)?,
                included: parse_switch(s, &arg(1)?)?,
            }),
            "toggle" => Ok(Action::FolderToggled {
                view_id: arg(0)?,
                uuid: arg(1)?,
            }),
            "select" => {
                let flags = flags(2);
                if let Some(unknown) = flags.iter().find(|f| !matches!(**f, "append" | "range")) {
                    return Err(invalid(s, &format!("unknown select flag '{}'", unknown)));
                }
                Ok(Action::NodeSelected {
                    view_id: arg(0)?,
                    uuid: arg(1)?,
                    append_selection: flags.contains("append"),
                    contiguous_selection: flags.contains("range"),
                })
            }
            "menu" => Ok(Action::ContextMenuOpened {
                view_id: arg(0)?,
                uuid: arg(1)?,
            }),
            "menu_close" => Ok(Action::ContextMenuClosed { view_id: arg(0)? }),
            "create" => {
                let node = if flags(4).contains("folder") {
                    DocRefNode::new_folder(arg(1)?, arg(2)?, arg(3)?)
                } else {
                    DocRefNode::new_doc(arg(1)?, arg(2)?, arg(3)?)
                };
                Ok(Action::NodeCreated {
                    parent_uuid: arg(0)?,
                    node,
                })
            }
            "rename" => Ok(Action::NodeRenamed {
                uuid: arg(0)?,
                name: args.get(1..).map(|rest| rest.join(":")).unwrap_or_default(),
            }),
            "delete" => Ok(Action::NodesDeleted {
                uuids: split_list(&arg(0)?),
            }),
            "move" => Ok(Action::NodesMoved {
                uuids: split_list(&arg(0)?),
                destination_uuid: arg(1)?,
            }),
            "copy" => Ok(Action::NodesCopied {
                uuids: split_list(&arg(0)?),
                destination_uuid: arg(1)?,
            }),
            "sequence" => {
                // sequence:[cmd1|cmd2|cmd3]
                let inner = rest
                    .strip_prefix('[')
                    .and_then(|inner| inner.strip_suffix(']'))
                    .ok_or_else(|| invalid(s, "expected sequence:[cmd|cmd]"))?;
                let actions = inner
                    .split('|')
                    .map(str::trim)
                    .filter(|cmd| !cmd.is_empty())
                    .map(Action::from_string)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Action::Sequence { actions })
            }
            _ => Err(invalid(s, "unknown command")),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::DocRefTypesReceived { types } => write!(f, "types:{}", types.join(",")),
            Action::ExplorerOpened {
                view_id,
                allow_multi_select,
                allow_drag_and_drop,
                type_filters,
            } => {
                write!(f, "open:{}", view_id)?;
                if *allow_multi_select {
                    write!(f, ":multi")?;
                }
                if *allow_drag_and_drop {
                    write!(f, ":dnd")?;
                }
                if !type_filters.is_empty() {
                    let list: Vec<&str> = type_filters.iter().map(String::as_str).collect();
                    write!(f, ":filter={}", list.join(","))?;
                }
                Ok(())
            }
            Action::ExplorerClosed { view_id } => write!(f, "close:{}", view_id),
            Action::TypeFilterChanged {
                view_id,
                doc_type,
                included,
            } => write!(f, "filter:{}:{}:{}", view_id, doc_type, switch(*included)),
            Action::TypeFiltersSelectAll { view_id, included } => {
                write!(f, "filter_all:{}:{}", view_id, switch(*included))
            }
            Action::SearchTermChanged {
                view_id,
                search_term,
            } => write!(f, "search:{}:{}", view_id, search_term),
            Action::FolderToggled { view_id, uuid } => write!(f, "toggle:{}:{}", view_id, uuid),
            Action::NodeSelected {
                view_id,
                uuid,
                append_selection,
                contiguous_selection,
            } => {
                write!(f, "select:{}:{}", view_id, uuid)?;
                if *append_selection {
                    write!(f, ":append")?;
                }
                if *contiguous_selection {
                    write!(f, ":range")?;
                }
                Ok(())
            }
            Action::ContextMenuOpened { view_id, uuid } => write!(f, "menu:{}:{}", view_id, uuid),
            Action::ContextMenuClosed { view_id } => write!(f, "menu_close:{}", view_id),
            Action::NodeCreated { parent_uuid, node } if node.children().is_empty() => {
                write!(
                    f,
                    "create:{}:{}:{}:{}",
                    parent_uuid, node.uuid, node.name, node.doc_type
                )?;
                if node.is_folder() {
                    write!(f, ":folder")?;
                }
                Ok(())
            }
            Action::NodeRenamed { uuid, name } => write!(f, "rename:{}:{}", uuid, name),
            Action::NodesDeleted { uuids } => write!(f, "delete:{}", uuids.join(",")),
            Action::NodesMoved {
                uuids,
                destination_uuid,
            } => write!(f, "move:{}:{}", uuids.join(","), destination_uuid),
            Action::NodesCopied {
                uuids,
                destination_uuid,
            } => write!(f, "copy:{}:{}", uuids.join(","), destination_uuid),
            Action::Sequence { actions } => {
                let commands: Vec<String> = actions.iter().map(ToString::to_string).collect();
                write!(f, "sequence:[{}]", commands.join("|"))
            }
            // Actions carrying trees only have a JSON form
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

fn invalid(command: &str, reason: &str) -> ExplorerError {
    ExplorerError::InvalidCommand(format!("{} ({})", command, reason))
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_switch(command: &str, value: &str) -> Result<bool> {
    match value {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => Err(invalid(command, &format!("expected on/off, got '{}'", other))),
    }
}

fn switch(included: bool) -> &'static str {
    if included {
        "on"
    } else {
        "off"
    }
}
