// Copyright (c) 2018 Fabian Schuiki

//! A JSON grammar.

use foresight::{
    GrammarBuilder, Lexer, Parser, ParserConfig, Pattern, RuleId, TokenType, TokenTypeId,
    Vocabulary,
};
use std::error::Error;

/// The token types of JSON.
#[allow(dead_code)]
pub struct Tokens {
    pub keyword: TokenTypeId,
    pub tru: TokenTypeId,
    pub fals: TokenTypeId,
    pub null: TokenTypeId,
    pub lcurly: TokenTypeId,
    pub rcurly: TokenTypeId,
    pub lsquare: TokenTypeId,
    pub rsquare: TokenTypeId,
    pub comma: TokenTypeId,
    pub colon: TokenTypeId,
    pub string: TokenTypeId,
    pub number: TokenTypeId,
    pub whitespace: TokenTypeId,
}

/// A lexer and parser for JSON documents.
#[allow(dead_code)]
pub struct Json {
    pub tokens: Tokens,
    pub lexer: Lexer,
    pub parser: Parser,
    pub object: RuleId,
    pub object_item: RuleId,
    pub array: RuleId,
    pub value: RuleId,
}

impl Tokens {
    fn declare(v: &mut Vocabulary) -> Tokens {
        let literal = |name: &str, text: &str, v: &mut Vocabulary| {
            TokenType::builder(name)
                .pattern(Pattern::literal(text))
                .build(v)
        };
        let keyword = TokenType::builder("Keyword").build(v);
        let tru = TokenType::builder("True")
            .pattern(Pattern::literal("true"))
            .category(keyword)
            .build(v);
        let fals = TokenType::builder("False")
            .pattern(Pattern::literal("false"))
            .category(keyword)
            .build(v);
        let null = TokenType::builder("Null")
            .pattern(Pattern::literal("null"))
            .category(keyword)
            .build(v);
        let lcurly = literal("LCurly", "{", v);
        let rcurly = literal("RCurly", "}", v);
        let lsquare = literal("LSquare", "[", v);
        let rsquare = literal("RSquare", "]", v);
        let comma = literal("Comma", ",", v);
        let colon = literal("Colon", ":", v);
        let string = TokenType::builder("StringLiteral")
            .pattern(Pattern::regex(
                r#""(?:[^\\"]|\\(?:[bfnrtv"\\/]|u[0-9a-fA-F]{4}))*""#,
            ))
            .build(v);
        let number = TokenType::builder("NumberLiteral")
            .pattern(Pattern::regex(r"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?"))
            .build(v);
        let whitespace = TokenType::builder("WhiteSpace")
            .pattern(Pattern::regex(r"[ \t\n\r]+"))
            .skipped()
            .build(v);
        Tokens {
            keyword,
            tru,
            fals,
            null,
            lcurly,
            rcurly,
            lsquare,
            rsquare,
            comma,
            colon,
            string,
            number,
            whitespace,
        }
    }

    /// The order in which the lexer tries the token types.
    fn lexer_order(&self) -> Vec<TokenTypeId> {
        vec![
            self.keyword,
            self.whitespace,
            self.number,
            self.string,
            self.comma,
            self.colon,
            self.lcurly,
            self.rcurly,
            self.lsquare,
            self.rsquare,
            self.tru,
            self.fals,
            self.null,
        ]
    }
}

impl Json {
    pub fn new() -> Result<Json, Box<dyn Error>> {
        Json::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Result<Json, Box<dyn Error>> {
        let mut vocab = Vocabulary::new();
        let t = Tokens::declare(&mut vocab);
        let lexer = Lexer::new(&vocab, &t.lexer_order())?;

        let mut g = GrammarBuilder::with_config(&vocab, config);
        let object = g.declare("object");
        let object_item = g.declare("objectItem");
        let array = g.declare("array");
        let value = g.declare("value");

        let (lcurly, rcurly, comma) = (t.lcurly, t.rcurly, t.comma);
        g.define(object, move |r| {
            r.consume(lcurly);
            r.option(|r| {
                r.subrule(object_item);
                r.many(|r| {
                    r.consume(comma);
                    r.subrule_at(2, object_item);
                });
            });
            r.consume(rcurly);
        });

        let (string, colon) = (t.string, t.colon);
        g.define(object_item, move |r| {
            r.consume(string);
            r.consume(colon);
            r.subrule(value);
        });

        let (lsquare, rsquare) = (t.lsquare, t.rsquare);
        g.define(array, move |r| {
            r.consume(lsquare);
            r.option(|r| {
                r.subrule(value);
                r.many(|r| {
                    r.consume(comma);
                    r.subrule_at(2, value);
                });
            });
            r.consume(rsquare);
        });

        let (number, tru, fals, null) = (t.number, t.tru, t.fals, t.null);
        g.define(value, move |r| {
            r.or("a value", |alts| {
                alts.alt(|r| r.consume(string))
                    .alt(|r| r.consume(number))
                    .alt(|r| r.subrule(object))
                    .alt(|r| r.subrule(array))
                    .alt(|r| r.consume(tru))
                    .alt(|r| r.consume(fals))
                    .alt(|r| r.consume(null));
            });
        });

        let parser = g.perform_self_analysis()?;
        Ok(Json {
            tokens: t,
            lexer,
            parser,
            object,
            object_item,
            array,
            value,
        })
    }
}
