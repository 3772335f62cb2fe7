use super::{Catalog, Family};
use phf::{Map, Set, phf_map, phf_set};

static FAMILIES: Map<&'static str, Family> = phf_map! {
    // control flow
    "if_statement"            => Family::If,
    "while_statement"         => Family::While,
    "do_statement"            => Family::DoWhile,
    "for_statement"           => Family::For,
    "enhanced_for_statement"  => Family::RangeFor,
    "switch_expression"       => Family::Switch,
    "break_statement"         => Family::Break,
    "continue_statement"      => Family::Continue,
    "return_statement"        => Family::Return,
    "throw_statement"         => Family::Throw,
    "try_statement"           => Family::Try,
    "try_with_resources_statement" => Family::Try,
    "synchronized_statement"  => Family::Sync,
    "labeled_statement"       => Family::Label,

    // structure
    "program"                 => Family::SourceFile,
    "block"                   => Family::Block,
    "constructor_body"        => Family::Block,
    "method_declaration"      => Family::FunctionDef,
    "constructor_declaration" => Family::FunctionDef,

    // plain statements
    "local_variable_declaration" => Family::Simple,
    "expression_statement"       => Family::Simple,
    "yield_statement"            => Family::Simple,

    "line_comment"  => Family::Trivia,
    "block_comment" => Family::Trivia,
};

static STATEMENTS: Set<&'static str> = phf_set! {
    "local_variable_declaration",
    "expression_statement",
    "yield_statement",
    "if_statement",
    "while_statement",
    "do_statement",
    "for_statement",
    "enhanced_for_statement",
    "switch_expression",
    "break_statement",
    "continue_statement",
    "return_statement",
    "throw_statement",
    "try_statement",
    "try_with_resources_statement",
    "synchronized_statement",
    "labeled_statement",
    "block",
};

static SIMPLE: Set<&'static str> = phf_set! {
    "local_variable_declaration",
    "expression_statement",
    "yield_statement",
};

static CONTROL: Set<&'static str> = phf_set! {
    "if_statement",
    "switch_expression",
    "while_statement",
    "do_statement",
    "for_statement",
    "enhanced_for_statement",
    "break_statement",
    "continue_statement",
    "return_statement",
    "throw_statement",
    "try_statement",
    "try_with_resources_statement",
    "synchronized_statement",
    "labeled_statement",
};

static LOOPS: Set<&'static str> = phf_set! {
    "while_statement",
    "do_statement",
    "for_statement",
    "enhanced_for_statement",
};

static JUMPS: Set<&'static str> = phf_set! {
    "break_statement",
    "continue_statement",
    "return_statement",
};

static BLOCK_HOLDERS: Set<&'static str> = phf_set! {
    "program",
    "block",
    "constructor_body",
    "class_body",
    "switch_block",
};

static DEFINITIONS: Set<&'static str> = phf_set! {
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "method_declaration",
    "constructor_declaration",
    "field_declaration",
};

static SCOPE_INTRODUCERS: Set<&'static str> = phf_set! {
    "program",
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "method_declaration",
    "constructor_declaration",
    "block",
    "constructor_body",
    "for_statement",
    "enhanced_for_statement",
    "catch_clause",
    "lambda_expression",
};

static DECLARATORS: Set<&'static str> = phf_set! {
    "variable_declarator",
    "formal_parameter",
    "catch_formal_parameter",
    "enhanced_for_statement",
    "spread_parameter",
};

static TYPE_KINDS: Set<&'static str> = phf_set! {
    "type_identifier",
    "integral_type",
    "floating_point_type",
    "boolean_type",
    "generic_type",
    "array_type",
    "scoped_type_identifier",
};

static METHOD_DECL_PARENTS: Set<&'static str> = phf_set! {
    "method_declaration",
    "constructor_declaration",
};

static CALL_PARENTS: Set<&'static str> = phf_set! {
    "method_invocation",
};

static ARGUMENT_LISTS: Set<&'static str> = phf_set! {
    "argument_list",
};

static IDENTIFIERS: Set<&'static str> = phf_set! {
    "identifier",
};

static COMMENTS: Set<&'static str> = phf_set! {
    "line_comment",
    "block_comment",
};

pub static CATALOG: Catalog = Catalog {
    families: &FAMILIES,
    statements: &STATEMENTS,
    simple_statements: &SIMPLE,
    control_statements: &CONTROL,
    loops: &LOOPS,
    jumps: &JUMPS,
    block_holders: &BLOCK_HOLDERS,
    definitions: &DEFINITIONS,
    scope_introducers: &SCOPE_INTRODUCERS,
    declarators: &DECLARATORS,
    type_kinds: &TYPE_KINDS,
    method_decl_parents: &METHOD_DECL_PARENTS,
    call_parents: &CALL_PARENTS,
    argument_lists: &ARGUMENT_LISTS,
    identifiers: &IDENTIFIERS,
    comments: &COMMENTS,
};
