//! Shell completion support for --set overrides
//!
//! Override keys are read off the JSON Schema of [`ProfileConfig`], so new
//! profile fields become completable without touching the scripts.

use schemars::schema::{RootSchema, Schema, SchemaObject};
use schemars::schema_for;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ProfileConfig;

/// Bash completion script that completes `--set` keys via `complete-paths`
pub fn generate_bash_completion(bin_name: &str) -> String {
    format!(
        r#"# Bash completion for {bin_name}
# Installation:
#   source <({bin_name} completions bash)

_{bin_name}_complete_set_key() {{
    local keys
    keys=$({bin_name} complete-paths 2>/dev/null)
    COMPREPLY=( $(compgen -W "$keys" -- "${{COMP_WORDS[COMP_CWORD]}}") )
}}

_{bin_name}() {{
    local cur prev words cword
    _init_completion || return

    if [[ "$prev" == "--set" ]]; then
        if [[ "$cur" == *"="* ]]; then
            return 0
        fi
        _{bin_name}_complete_set_key
        if [[ ${{#COMPREPLY[@]}} -gt 0 ]]; then
            local i
            for i in "${{!COMPREPLY[@]}}"; do
                COMPREPLY[$i]="${{COMPREPLY[$i]}}="
            done
        fi
        compopt -o nospace
        return 0
    fi

    case "$prev" in
        -P)
            _filedir toml
            return 0
            ;;
        -i|--input|-o|--output)
            _filedir
            return 0
            ;;
        -f|--format)
            COMPREPLY=( $(compgen -W "table json" -- "$cur") )
            return 0
            ;;
        -l|--log-level)
            COMPREPLY=( $(compgen -W "trace debug info warn error" -- "$cur") )
            return 0
            ;;
    esac

    if [[ $cword -eq 1 ]]; then
        COMPREPLY=( $(compgen -W "query run replay completions schema help" -- "$cur") )
        return 0
    fi

    case "${{words[1]}}" in
        completions)
            COMPREPLY=( $(compgen -W "bash zsh fish elvish powershell" -- "$cur") )
            ;;
        query)
            COMPREPLY=( $(compgen -W "--period --statistic --region --profile --utc --no-color --format --output" -- "$cur") )
            ;;
        run)
            COMPREPLY=( $(compgen -W "-P --profile --set --utc --no-color --format --output" -- "$cur") )
            ;;
        replay)
            COMPREPLY=( $(compgen -W "--input --threshold --hits --start --end --utc --no-color --format --output" -- "$cur") )
            ;;
    esac
}}

complete -F _{bin_name} {bin_name}
"#,
        bin_name = bin_name
    )
}

/// All dotted profile paths accepted by `--set`
pub fn get_config_paths() -> Vec<String> {
    let schema = schema_for!(ProfileConfig);
    let mut paths = BTreeSet::new();

    extract_paths_from_root(&schema, &mut paths);

    paths.into_iter().collect()
}

fn extract_paths_from_root(root_schema: &RootSchema, paths: &mut BTreeSet<String>) {
    extract_paths_from_object(&root_schema.schema, "", paths, &root_schema.definitions);
}

fn extract_paths_from_object(
    schema: &SchemaObject,
    prefix: &str,
    paths: &mut BTreeSet<String>,
    definitions: &BTreeMap<String, Schema>,
) {
    if let Some(obj) = &schema.object {
        for (prop_name, prop_schema) in &obj.properties {
            let path = if prefix.is_empty() {
                prop_name.clone()
            } else {
                format!("{}.{}", prefix, prop_name)
            };
            paths.insert(path.clone());
            extract_paths_from_schema(prop_schema, &path, paths, definitions);
        }
    }

    // Tagged enums (oneOf) and documented references (allOf)
    if let Some(subschemas) = &schema.subschemas {
        let variants = subschemas.one_of.iter().chain(subschemas.all_of.iter()).flatten();
        for variant in variants {
            extract_paths_from_schema(variant, prefix, paths, definitions);
        }
    }
}

fn extract_paths_from_schema(
    schema: &Schema,
    prefix: &str,
    paths: &mut BTreeSet<String>,
    definitions: &BTreeMap<String, Schema>,
) {
    let Schema::Object(obj) = schema else {
        return;
    };

    match &obj.reference {
        Some(reference) => {
            let definition = reference
                .strip_prefix("#/definitions/")
                .and_then(|name| definitions.get(name));
            if let Some(definition) = definition {
                extract_paths_from_schema(definition, prefix, paths, definitions);
            }
        }
        None => extract_paths_from_object(obj, prefix, paths, definitions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_config_paths() {
        let paths = get_config_paths();

        for section in ["metric", "window", "trigger", "source", "output"] {
            assert!(paths.contains(&section.to_string()), "missing {}", section);
        }

        for nested in [
            "metric.namespace",
            "metric.period",
            "metric.dimension.value",
            "window.start",
            "window.end",
            "trigger.threshold",
            "trigger.consecutive_hits",
            "source.type",
            "source.region",
            "source.path",
            "output.format",
            "output.utc",
        ] {
            assert!(paths.contains(&nested.to_string()), "missing {}", nested);
        }
    }

    #[test]
    fn test_bash_script_uses_complete_paths() {
        let script = generate_bash_completion("alarmsim");
        assert!(script.contains("alarmsim complete-paths"));
        assert!(script.ends_with("complete -F _alarmsim alarmsim\n"));
    }
}
