use super::{Catalog, Family};
use phf::{Map, Set, phf_map, phf_set};

static FAMILIES: Map<&'static str, Family> = phf_map! {
    // control flow
    "if_statement"       => Family::If,
    "while_statement"    => Family::While,
    "do_statement"       => Family::DoWhile,
    "for_statement"      => Family::For,
    "switch_statement"   => Family::Switch,
    "break_statement"    => Family::Break,
    "continue_statement" => Family::Continue,
    "return_statement"   => Family::Return,
    "goto_statement"     => Family::Goto,
    "labeled_statement"  => Family::Label,

    // structure
    "translation_unit"    => Family::SourceFile,
    "compound_statement"  => Family::Block,
    "function_definition" => Family::FunctionDef,

    // plain statements
    "declaration"          => Family::Simple,
    "expression_statement" => Family::Simple,

    "comment" => Family::Trivia,
};

static STATEMENTS: Set<&'static str> = phf_set! {
    "declaration",
    "expression_statement",
    "if_statement",
    "while_statement",
    "do_statement",
    "for_statement",
    "switch_statement",
    "case_statement",
    "break_statement",
    "continue_statement",
    "return_statement",
    "goto_statement",
    "labeled_statement",
    "compound_statement",
};

static SIMPLE: Set<&'static str> = phf_set! {
    "declaration",
    "expression_statement",
};

static CONTROL: Set<&'static str> = phf_set! {
    "if_statement",
    "switch_statement",
    "while_statement",
    "do_statement",
    "for_statement",
    "break_statement",
    "continue_statement",
    "return_statement",
    "goto_statement",
    "labeled_statement",
};

static LOOPS: Set<&'static str> = phf_set! {
    "while_statement",
    "do_statement",
    "for_statement",
};

static JUMPS: Set<&'static str> = phf_set! {
    "break_statement",
    "continue_statement",
    "return_statement",
    "goto_statement",
};

static BLOCK_HOLDERS: Set<&'static str> = phf_set! {
    "translation_unit",
    "compound_statement",
};

static DEFINITIONS: Set<&'static str> = phf_set! {
    "function_definition",
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
    "type_definition",
    "field_declaration",
};

static SCOPE_INTRODUCERS: Set<&'static str> = phf_set! {
    "translation_unit",
    "function_definition",
    "compound_statement",
    "for_statement",
};

static DECLARATORS: Set<&'static str> = phf_set! {
    "declaration",
    "init_declarator",
    "parameter_declaration",
    "pointer_declarator",
    "array_declarator",
};

static TYPE_KINDS: Set<&'static str> = phf_set! {
    "primitive_type",
    "type_identifier",
    "sized_type_specifier",
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
};

static METHOD_DECL_PARENTS: Set<&'static str> = phf_set! {
    "function_declarator",
};

static CALL_PARENTS: Set<&'static str> = phf_set! {
    "call_expression",
};

static ARGUMENT_LISTS: Set<&'static str> = phf_set! {
    "argument_list",
};

static IDENTIFIERS: Set<&'static str> = phf_set! {
    "identifier",
};

static COMMENTS: Set<&'static str> = phf_set! {
    "comment",
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
