use crate::json_io::{print_json, read_tree};
use anyhow::Result;
use clap::Subcommand;
use pathbind::v1::{create, serialize};
use pathbind_samples::policy::{MetadataPolicy, MetadataPolicyProperties};
use serde_json::Value;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Subcommand, Debug)]
pub enum PolicyOp {
    /// Grant a role rule to a user
    AddUser {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Rule id or id prefix, e.g. "purviewmetadatarole_builtin_data-curator"
        #[arg(long)]
        rule: String,

        /// User object id
        #[arg(long)]
        user: String,
    },
    /// Grant a role rule to a group
    AddGroup {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Rule id or id prefix
        #[arg(long)]
        rule: String,

        /// Group object id
        #[arg(long)]
        group: String,
    },
}

#[derive(Debug, Clone, Copy)]
enum Principal {
    User,
    Group,
}

pub fn run(op: PolicyOp, pretty: bool) -> Result<()> {
    let (input, rule, id, principal) = match op {
        PolicyOp::AddUser { input, rule, user } => (input, rule, user, Principal::User),
        PolicyOp::AddGroup { input, rule, group } => (input, rule, group, Principal::Group),
    };
    let tree = read_tree(&input)?;
    print_json(&grant(&tree, &rule, &id, principal)?, pretty)
}

fn grant(tree: &Value, rule_id: &str, object_id: &str, principal: Principal) -> Result<Value> {
    let policy = create::<MetadataPolicy>(tree)?;
    let properties = Rc::clone(&policy.borrow().properties);
    let rule = MetadataPolicyProperties::rule_by_id(&properties, rule_id)?;
    tracing::debug!(rule = %rule.borrow().id, ?principal, object_id, "granting rule");
    match principal {
        Principal::User => rule.borrow_mut().add_user(object_id),
        Principal::Group => rule.borrow_mut().add_group(object_id),
    }
    let out = serialize(&*policy.borrow())?;
    Ok(out)
}
