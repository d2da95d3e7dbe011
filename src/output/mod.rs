mod styling;

use std::fmt::Write;

use crate::model::{NodeRef, PipelineTree, TreeNode};
use styling::{bright_green, bright_red, bright_yellow, cyan, dim, magenta_bold};

pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔭 cipanel"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI pipeline activity panel")
    );
}

/// Renders the current tree as an indented snapshot, one node per line.
/// This is the terminal stand-in for the host's tree widget.
pub fn render_tree(tree: &PipelineTree) -> String {
    let mut output = String::new();

    if tree.is_empty() {
        let _ = writeln!(output, "{}", dim("(no pipeline activity)"));
        return output;
    }

    for owner in tree.children(None) {
        render_node(&mut output, owner, 0);
    }
    output
}

pub fn print_tree(tree: &PipelineTree) {
    println!("{}", render_tree(tree));
}

fn render_node(output: &mut String, node: NodeRef<'_>, depth: usize) {
    let indent = "  ".repeat(depth);
    let line = match node {
        NodeRef::Owner(owner) => format!("{}", cyan(owner.label())),
        NodeRef::Repo(repo) => repo.label().to_string(),
        NodeRef::Build(build) => {
            format!("#{} {}", build.label(), colored_status(build.status()))
        }
        NodeRef::Stage(stage) => {
            format!("{} {}", stage.label(), colored_status(stage.status()))
        }
    };
    let _ = writeln!(output, "{indent}{line}");

    for child in node.children() {
        render_node(output, child, depth + 1);
    }
}

fn colored_status(status: &str) -> String {
    match status {
        "Succeeded" => bright_green(status).to_string(),
        "Failed" | "Error" => bright_red(status).to_string(),
        "Running" => bright_yellow(status).to_string(),
        _ => dim(status).to_string(),
    }
}
