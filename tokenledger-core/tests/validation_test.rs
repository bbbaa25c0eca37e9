use serde_json::{json, Value};
use tokenledger_core::validation::EMPTY_NETWORK_ERROR;
use tokenledger_core::{
    AgentNetworkValidator, CompositeNetworkValidator, CyclesNetworkValidator,
    KeywordNetworkValidator, LedgerError,
};

fn hello_world_network() -> Value {
    json!({
        "llm_config": {"model_name": "gpt-4o"},
        "tools": [
            {
                "name": "announcer",
                "instructions": "Announce the greeting.",
                "tools": ["synonymizer"]
            },
            {
                "name": "synonymizer",
                "instructions": "Find synonyms."
            }
        ]
    })
}

mod composite_tests {
    use super::*;

    #[test]
    fn test_standard_composite_accepts_valid_network() {
        let validator = CompositeNetworkValidator::standard();
        assert_eq!(validator.len(), 2);
        assert!(validator.validate(Some(&hello_world_network())).is_empty());
        assert!(validator.check(Some(&hello_world_network())).is_ok());
    }

    #[test]
    fn test_missing_network_reported_by_each_validator() {
        let errors = CompositeNetworkValidator::standard().validate(None);
        assert_eq!(errors, vec![EMPTY_NETWORK_ERROR.to_string(); 2]);
    }

    #[test]
    fn test_findings_are_concatenated_in_order() {
        let network = json!({
            "tools": [
                {"name": "frontman", "instructions": "", "tools": ["helper"]},
                {"name": "helper", "instructions": "Help.", "tools": ["frontman"]}
            ]
        });

        let errors = CompositeNetworkValidator::standard().validate(Some(&network));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "frontman 'instructions' cannot be empty.");
        assert!(errors[1].starts_with("Cycle found in agent network:"));
    }

    #[test]
    fn test_check_wraps_errors_in_validation_error() {
        let network = json!({"a": {"tools": ["a"]}});
        let err = CompositeNetworkValidator::new()
            .with(CyclesNetworkValidator::new())
            .check(Some(&network))
            .unwrap_err();

        assert_eq!(err.error_code(), "E9004");
        assert!(matches!(err, LedgerError::ValidationError(ref msg) if msg.contains("a -> a")));
    }

    #[test]
    fn test_empty_composite_accepts_anything() {
        let validator = CompositeNetworkValidator::new();
        assert!(validator.is_empty());
        assert!(validator.validate(None).is_empty());
    }
}

mod cycles_tests {
    use super::*;

    #[test]
    fn test_external_tools_are_not_edges() {
        let network = json!({
            "tools": [
                {"name": "frontman", "tools": ["/website_search", "math_guy"]},
                {"name": "math_guy", "tools": ["calculator"]}
            ]
        });
        assert!(CyclesNetworkValidator::new()
            .validate(Some(&network))
            .is_empty());
    }

    #[test]
    fn test_long_cycle_path() {
        let network = json!({
            "tools": [
                {"name": "a", "tools": ["b"]},
                {"name": "b", "tools": ["c"]},
                {"name": "c", "tools": ["d"]},
                {"name": "d", "tools": ["b"]}
            ]
        });
        let errors = CyclesNetworkValidator::new().validate(Some(&network));
        assert_eq!(
            errors,
            vec!["Cycle found in agent network: b -> c -> d -> b".to_string()]
        );
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let network = json!({
            "top": {"tools": ["left", "right"]},
            "left": {"tools": ["bottom"]},
            "right": {"tools": ["bottom"]},
            "bottom": {}
        });
        assert!(CyclesNetworkValidator::new()
            .validate(Some(&network))
            .is_empty());
    }

    #[test]
    fn test_non_object_network_is_empty() {
        let errors = CyclesNetworkValidator::new().validate(Some(&json!("not a network")));
        assert_eq!(errors, vec![EMPTY_NETWORK_ERROR.to_string()]);
    }
}

mod keyword_tests {
    use super::*;

    #[test]
    fn test_every_empty_instruction_is_reported() {
        let network = json!({
            "first": {"instructions": ""},
            "second": {"instructions": ""},
            "third": {"instructions": "Do things."}
        });
        let mut errors = KeywordNetworkValidator::new().validate(Some(&network));
        errors.sort();
        assert_eq!(
            errors,
            vec![
                "first 'instructions' cannot be empty.".to_string(),
                "second 'instructions' cannot be empty.".to_string(),
            ]
        );
    }

    #[test]
    fn test_validator_names() {
        assert_eq!(KeywordNetworkValidator::new().name(), "keywords");
        assert_eq!(CyclesNetworkValidator::new().name(), "cycles");
        assert_eq!(CompositeNetworkValidator::new().name(), "composite");
    }
}
