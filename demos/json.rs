// Copyright (c) 2018 Fabian Schuiki

//! Parse JSON documents and print their syntax trees.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

mod json_grammar;

use clap::{App, Arg};
use foresight::{ParseNode, ParseTree, Parser};
use std::fs;
use std::process;

use crate::json_grammar::Json;

fn main() {
    let matches = App::new("json")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Parses JSON documents")
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help("Increase message verbosity"),
        )
        .arg(
            Arg::with_name("tree")
                .short("t")
                .long("tree")
                .help("Print the syntax tree of each document"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("The JSON files to parse")
                .required(true)
                .multiple(true),
        )
        .get_matches();

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .module("foresight")
        .verbosity(matches.occurrences_of("verbosity") as usize)
        .init()
    {
        eprintln!("warning: {}", e);
    }

    let json = match Json::new() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    let mut failed = false;
    for path in matches.values_of("INPUT").into_iter().flatten() {
        debug!("parsing {}", path);
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("{}: {}", path, e);
                failed = true;
                continue;
            }
        };
        match json.parser.parse_text(&json.lexer, json.value, &text) {
            Ok(tree) => {
                info!("{}: {} tokens", path, tree.token_count());
                if matches.is_present("tree") {
                    print_tree(&json.parser, &tree, 0);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", path, e);
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}

fn print_tree(parser: &Parser, tree: &ParseTree, indent: usize) {
    println!("{:2$}{}", "", parser.rule_name(tree.rule), indent);
    for child in &tree.children {
        match *child {
            ParseNode::Token(ref token) => println!(
                "{:3$}{} {}",
                "",
                parser.vocabulary().name(token.kind),
                token.image,
                indent + 2
            ),
            ParseNode::Tree(ref subtree) => print_tree(parser, subtree, indent + 2),
        }
    }
}
