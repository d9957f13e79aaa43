//! Installation Plan Tests
//!
//! Compile plans from answer files the way the command line does and check
//! the step order, extension steps and the serialized form.

use serde_json::json;

use websetup::engine::plan::ModuleStep;
use websetup::{
    compile, AnswerSet, ExtensionRegistry, RequirementReport, SetupConfig, SetupExtension, Step,
};

/// Extension that is finished and contributes one step
struct Module {
    name: &'static str,
    finished: bool,
}

impl SetupExtension for Module {
    fn name(&self) -> &str {
        self.name
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn steps(&self) -> Vec<Step> {
        vec![Step::Module(ModuleStep {
            module: self.name.to_string(),
            action: "enable".to_string(),
            params: json!({}),
        })]
    }

    fn requirements(&self) -> RequirementReport {
        RequirementReport::new()
    }
}

fn db_answers() -> AnswerSet {
    serde_json::from_value(json!({
        "setup_welcome": {},
        "setup_requirements": {},
        "setup_authentication_type": { "type": "db" },
        "setup_preferences_type": { "type": "db" },
        "setup_db_resource": {
            "name": "icingaweb_db",
            "db": "pgsql",
            "host": "db.example.com",
            "dbname": "icingaweb2",
            "username": "icingaweb2",
            "password": "secret",
            "skip_validation": false
        },
        "setup_authentication_backend": { "name": "icingaweb2", "backend": "db" },
        "setup_admin_account": {
            "user_type": "new_user",
            "new_user": "icingaadmin",
            "new_user_password": "icinga"
        },
        "setup_general_config": {
            "global_filemode": "2770",
            "logging": { "type": "file", "level": "DEBUG", "file": "/var/log/icingaweb2/icingaweb2.log" }
        },
        "setup_modules": { "selected": ["monitoring", "director"] }
    }))
    .expect("valid answers")
}

#[test]
fn test_answers_file_compiles_in_order() {
    let plan = compile(&db_answers(), &SetupConfig::default(), &ExtensionRegistry::new()).unwrap();
    assert_eq!(
        plan.kinds(),
        vec!["database", "general_config", "authentication", "resource", "make_dir"]
    );

    let Step::Database(database) = &plan.steps[0] else {
        panic!("expected database step");
    };
    assert_eq!(database.resource.effective_port(), 5432);
    assert_eq!(database.admin_name, None);

    let Step::GeneralConfig(general) = &plan.steps[1] else {
        panic!("expected general config step");
    };
    assert_eq!(general.preferences_resource.as_deref(), Some("icingaweb_db"));
}

#[test]
fn test_extension_steps_follow_core_steps_in_registration_order() {
    let mut extensions = ExtensionRegistry::new();
    extensions.register(Box::new(Module {
        name: "monitoring",
        finished: true,
    }));
    extensions.register(Box::new(Module {
        name: "graphite",
        finished: true,
    }));
    extensions.register(Box::new(Module {
        name: "director",
        finished: true,
    }));
    extensions.register(Box::new(Module {
        name: "businessprocess",
        finished: false,
    }));

    let plan = compile(&db_answers(), &SetupConfig::default(), &extensions).unwrap();
    let modules: Vec<&str> = plan
        .steps
        .iter()
        .filter_map(|step| match step {
            Step::Module(module) => Some(module.module.as_str()),
            _ => None,
        })
        .collect();
    // graphite is not selected, businessprocess is not finished
    assert_eq!(modules, vec!["monitoring", "director"]);
    assert_eq!(plan.position("module"), Some(5));
}

#[test]
fn test_plan_json_shape() {
    let plan = compile(&db_answers(), &SetupConfig::new("/etc/icingaweb2"), &ExtensionRegistry::new())
        .unwrap();
    let value = serde_json::to_value(&plan).unwrap();
    let steps = value["steps"].as_array().unwrap();

    assert_eq!(steps[0]["kind"], "database");
    assert_eq!(steps[0]["params"]["tables"][0], "icingaweb_group");
    assert_eq!(steps[1]["params"]["file_mode"], "2770");
    assert_eq!(steps[2]["params"]["resource_name"], "icingaweb_db");
    assert_eq!(steps[2]["params"]["admin_account"]["username"], "icingaadmin");
    assert_eq!(steps[4]["params"]["paths"][2], "/etc/icingaweb2/enabledModules");

    let reparsed: websetup::InstallationPlan = serde_json::from_value(value).unwrap();
    assert_eq!(reparsed, plan);
}

#[test]
fn test_plan_display_numbers_steps() {
    let plan = compile(&db_answers(), &SetupConfig::default(), &ExtensionRegistry::new()).unwrap();
    let text = plan.to_string();
    assert!(text.starts_with("Installation Plan (5 steps):"));
    assert!(text.contains("  1. Database: create or update schema 'icingaweb2' on db.example.com:5432"));
    assert!(text.contains("  4. Resources: icingaweb_db"));
}

#[test]
fn test_answers_survive_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("answers.json");
    let answers = db_answers();
    std::fs::write(&path, serde_json::to_string_pretty(&answers).unwrap()).unwrap();

    let loaded = AnswerSet::load_from_file(&path).unwrap();
    assert_eq!(loaded, answers);
}
