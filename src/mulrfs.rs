extern crate clap;
use clap::*;

mod cmd_mulrfs;

fn main() -> anyhow::Result<()> {
    let app = Command::new("mulrfs")
        .version(crate_version!())
        .about("`mulrfs` - Multi-labeled gene tree preprocessing for RF supertree scoring")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_mulrfs::prep::make_subcommand())
        .subcommand(cmd_mulrfs::cmp::make_subcommand())
        .subcommand(cmd_mulrfs::check::make_subcommand())
        .after_help(
            r###"
Gene families evolve by duplication and loss, so a gene tree may carry
several copies of the same species label (a MUL-tree). `prep` reduces each
MUL-tree to a singly-labeled tree plus a constant score shift, after which
any standard Robinson-Foulds machinery applies.

Subcommands:

* prep:  preprocess MUL-trees for an RF supertree solver
* cmp:   normalized RF distance between paired trees
* check: verify the score-shift identity against an external scorer

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("prep", sub_matches)) => cmd_mulrfs::prep::execute(sub_matches),
        Some(("cmp", sub_matches)) => cmd_mulrfs::cmp::execute(sub_matches),
        Some(("check", sub_matches)) => cmd_mulrfs::check::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
