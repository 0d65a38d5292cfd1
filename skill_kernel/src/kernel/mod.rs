//! Kernel - the registry of skills and generator factories, and the entry
//! point for single and chained calls.
//!
//! A kernel is filled during setup through `&mut Kernel` and only read
//! afterwards, so a finished kernel can be shared between threads.
//!
//! # Chained calls
//!
//! [`Kernel::call`] runs functions in order on one running [`Content`].
//! After each step the running content's root value becomes the step's
//! response value, while every named property (given by the caller or
//! written as a default) stays in place for the following steps. When the
//! chain ends, successfully or not, the caller's root value is put back.

mod path;

pub use path::*;

use context_store::{Content, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, debug_span, info};
use uuid::Uuid;

use crate::error::KernelError;
use crate::generator::{Generator, GeneratorConfig, GeneratorFactory, Generators};
use crate::skill::{CallOverrides, Function, Skill, SkillDefinition, SkillTemplates};

/// Identifies one kernel call in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    /// Create a new random call ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of skills and generator factories.
#[derive(Default)]
pub struct Kernel {
    skills: BTreeMap<String, Arc<Skill>>,
    factories: BTreeMap<String, Arc<dyn GeneratorFactory>>,
}

impl Kernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator factory under its type id.
    pub fn register_generator_factory(
        &mut self,
        factory: impl GeneratorFactory + 'static,
    ) -> Result<(), KernelError> {
        let type_id = factory.type_id().to_string();
        if self.factories.contains_key(&type_id) {
            return Err(KernelError::DuplicateGenerator(type_id));
        }
        info!(type_id = %type_id, "registered generator factory");
        self.factories.insert(type_id, Arc::new(factory));
        Ok(())
    }

    /// Build one generator instance from its configuration record.
    pub fn create_generator(&self, config: &GeneratorConfig) -> Result<Arc<dyn Generator>, KernelError> {
        let factory = self
            .factories
            .get(&config.type_id)
            .ok_or_else(|| KernelError::GeneratorTypeUnknown(config.type_id.clone()))?;

        factory
            .create(&config.config)
            .map_err(|source| KernelError::GeneratorConstructionFailed {
                type_id: config.type_id.clone(),
                source,
            })
    }

    /// Build named generator instances, for example the `generators` section
    /// of a skill definition.
    pub fn create_generators(
        &self,
        configs: &BTreeMap<String, GeneratorConfig>,
    ) -> Result<Generators, KernelError> {
        let mut generators = Generators::new();
        for (name, config) in configs {
            generators.insert(name.clone(), self.create_generator(config)?);
        }
        Ok(generators)
    }

    pub fn generator_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Add a skill. Skill names are unique.
    pub fn add_skill(&mut self, skill: Skill) -> Result<(), KernelError> {
        if skill.name.is_empty() {
            return Err(KernelError::InvalidDefinition("skill name is empty".into()));
        }
        if self.skills.contains_key(&skill.name) {
            return Err(KernelError::DuplicateSkill(skill.name));
        }
        info!(
            skill = %skill.name,
            functions = skill.function_names().count(),
            "registered skill"
        );
        self.skills.insert(skill.name.clone(), Arc::new(skill));
        Ok(())
    }

    /// Build a skill with access to this kernel (for its generator
    /// factories) and add it.
    pub fn register_skill<F>(&mut self, build: F) -> Result<(), KernelError>
    where
        F: FnOnce(&Kernel) -> Result<Skill, KernelError>,
    {
        let skill = build(self)?;
        self.add_skill(skill)
    }

    /// Build a skill from its definition record and template text, then add it.
    pub fn load_skill(
        &mut self,
        definition: SkillDefinition,
        templates: &SkillTemplates,
    ) -> Result<(), KernelError> {
        self.load_skill_with(definition, templates, CallOverrides::new())
    }

    /// Like [`Kernel::load_skill`], replacing the calls of the functions
    /// named in `overrides`.
    pub fn load_skill_with(
        &mut self,
        definition: SkillDefinition,
        templates: &SkillTemplates,
        overrides: CallOverrides,
    ) -> Result<(), KernelError> {
        let generators = self.create_generators(&definition.generators)?;
        let skill = definition.build(&generators, templates, overrides)?;
        self.add_skill(skill)
    }

    pub fn find_skill(&self, name: &str) -> Result<&Arc<Skill>, KernelError> {
        self.skills
            .get(name)
            .ok_or_else(|| KernelError::SkillNotFound(name.to_string()))
    }

    pub fn find_function(&self, skill: &str, function: &str) -> Result<&Arc<Function>, KernelError> {
        self.find_skill(skill)?
            .function(function)
            .ok_or_else(|| KernelError::FunctionNotFound {
                skill: skill.to_string(),
                function: function.to_string(),
            })
    }

    /// Look up a function by its `skill.function` path.
    pub fn find_function_path(&self, path: &str) -> Result<&Arc<Function>, KernelError> {
        let path: FunctionPath = path.parse()?;
        self.find_function(&path.skill, &path.function)
    }

    /// Look up several paths. Returns the functions found, in order, and one
    /// error per path that failed.
    pub fn resolve_functions<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> (Vec<Arc<Function>>, Vec<KernelError>) {
        let mut functions = Vec::new();
        let mut errors = Vec::new();
        for path in paths {
            match self.find_function_path(path) {
                Ok(function) => functions.push(function.clone()),
                Err(err) => errors.push(err),
            }
        }
        (functions, errors)
    }

    /// Look up several paths, failing with every lookup error if any path
    /// does not resolve.
    pub fn find_functions<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<Arc<Function>>, KernelError> {
        let (functions, errors) = self.resolve_functions(paths);
        if errors.is_empty() {
            Ok(functions)
        } else {
            Err(KernelError::Unresolved(errors))
        }
    }

    pub fn skills(&self) -> impl Iterator<Item = &Arc<Skill>> {
        self.skills.values()
    }

    /// Call one function, or a chain of functions in order, on `input`.
    ///
    /// Returns the response of the last function, linked to `input`. Each
    /// step sees the previous step's response as root value; `input` gets its
    /// original root value back before the response is linked, so the
    /// response's predecessor equals `input` as the caller holds it. The
    /// first failing step aborts the chain.
    pub fn call(&self, input: &mut Content, functions: &[Arc<Function>]) -> Result<Content, KernelError> {
        if functions.is_empty() {
            return Err(KernelError::EmptyChain);
        }

        let call_id = CallId::new();
        let span = debug_span!("kernel_call", %call_id, steps = functions.len());
        let _entered = span.enter();

        let original = input.own_value().cloned();
        let result = Self::run_chain(input, functions);
        input.replace_value(original.unwrap_or_default());

        match result {
            Ok(mut response) => {
                response.set_predecessor(input.clone());
                Ok(response)
            }
            Err(err) => {
                debug!(error = %err, "call chain aborted");
                Err(err)
            }
        }
    }

    fn run_chain(input: &mut Content, functions: &[Arc<Function>]) -> Result<Content, KernelError> {
        let mut response = None;
        for (step, function) in functions.iter().enumerate() {
            debug!(step, function = %function.name, "running chain step");
            let output = function.call(input)?;
            input.replace_value(output.own_value().cloned().unwrap_or(Value::Null));
            response = Some(output);
        }
        response.ok_or(KernelError::EmptyChain)
    }

    /// Call a single function addressed by skill and function name.
    pub fn call_function(
        &self,
        skill: &str,
        function: &str,
        input: &mut Content,
    ) -> Result<Content, KernelError> {
        let function = self.find_function(skill, function)?.clone();
        self.call(input, &[function])
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("skills", &self.skills.keys().collect::<Vec<_>>())
            .field("generator_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use crate::generator::{echo_factory, ECHO_TYPE_ID};
    use crate::skill::{FunctionCall, Parameter, TemplatedCall};
    use crate::template::PromptTemplate;
    use context_store::Role;

    fn tagging_generator(tag: &'static str) -> Arc<dyn Generator> {
        Arc::new(move |input: &Content| -> Result<Content, GeneratorError> {
            Ok(Content::from_value(format!("{}[{}]", tag, input.string_value())).with_role(Role::Assistant))
        })
    }

    fn templated(name: &str, source: &str, tag: &'static str) -> TemplatedCall {
        TemplatedCall::new(PromptTemplate::parse(name, source).unwrap(), tagging_generator(tag))
    }

    fn fun_skill() -> Skill {
        let joke = Function::new("joke", "Generate a funny joke", templated("fun.joke", "{{value}}", "JOKE"))
            .with_parameter("style", Parameter::new("Style of the joke").with_default("one-liner"));
        let translate = Function::new(
            "translate",
            "Translate the input",
            templated("fun.translate", "Translate into {{language}}: {{value}}", "T"),
        )
        .with_parameter(
            "language",
            Parameter::new("Target language").required().with_default("english"),
        );
        let fail = Function::new(
            "fail",
            "Always fails",
            FunctionCall::native(|_: &Content| -> Result<Content, GeneratorError> {
                Err(GeneratorError::Backend("overloaded".into()))
            }),
        );

        Skill::new("fun", "Funny skills")
            .with_function(joke)
            .and_then(|skill| skill.with_function(translate))
            .and_then(|skill| skill.with_function(fail))
            .unwrap()
    }

    fn kernel() -> Kernel {
        let mut kernel = Kernel::new();
        kernel.register_generator_factory(echo_factory()).unwrap();
        kernel.add_skill(fun_skill()).unwrap();
        kernel
    }

    #[test]
    fn test_duplicate_registrations() {
        let mut kernel = kernel();

        let err = kernel.register_generator_factory(echo_factory()).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateGenerator(id) if id == ECHO_TYPE_ID));

        let err = kernel.add_skill(Skill::new("fun", "again")).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateSkill(name) if name == "fun"));
    }

    #[test]
    fn test_create_generator() {
        let kernel = kernel();

        let generator = kernel
            .create_generator(&GeneratorConfig::new(ECHO_TYPE_ID).with("prefix", "> "))
            .unwrap();
        assert_eq!(generator.generate(&Content::from_value("hi")).unwrap().string_value(), "> hi");

        let unknown = kernel.create_generator(&GeneratorConfig::new("gpt")).err().unwrap();
        assert!(matches!(unknown, KernelError::GeneratorTypeUnknown(id) if id == "gpt"));

        let bad = kernel
            .create_generator(&GeneratorConfig::new(ECHO_TYPE_ID).with("prefix", 5))
            .err()
            .unwrap();
        assert!(matches!(
            bad,
            KernelError::GeneratorConstructionFailed {
                source: GeneratorError::InvalidConfig(_),
                ..
            }
        ));
    }

    #[test]
    fn test_find_functions_partial() {
        let kernel = kernel();

        let (found, errors) = kernel.resolve_functions(["fun.joke", "badformat", "ghost.joke", "fun.missing"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "joke");
        assert_eq!(errors.len(), 3);
        assert!(matches!(&errors[0], KernelError::InvalidPath(p) if p == "badformat"));
        assert!(matches!(&errors[1], KernelError::SkillNotFound(s) if s == "ghost"));
        assert!(matches!(&errors[2], KernelError::FunctionNotFound { function, .. } if function == "missing"));

        let err = kernel.find_functions(["fun.joke", "badformat"]).unwrap_err();
        assert!(matches!(err, KernelError::Unresolved(errors) if errors.len() == 1));

        let functions = kernel.find_functions(["fun.joke", "fun.translate"]).unwrap();
        assert_eq!(functions.len(), 2);
    }

    #[test]
    fn test_invalid_paths() {
        let kernel = kernel();
        for path in ["a.b.c", ".x", "fun."] {
            assert!(matches!(kernel.find_function_path(path), Err(KernelError::InvalidPath(_))));
        }
    }

    #[test]
    fn test_single_call_linkage() {
        let kernel = kernel();
        let mut input = Content::from_value("dinosaurs");

        let response = kernel.call_function("fun", "joke", &mut input).unwrap();
        assert_eq!(response.string_value(), "JOKE[dinosaurs]");
        assert_eq!(response.role(), Role::Assistant);

        let predecessor = response.predecessor().unwrap();
        assert_eq!(predecessor.string_value(), "dinosaurs");
        assert_eq!(predecessor.property("style"), Some(&Value::from("one-liner")));
    }

    #[test]
    fn test_chain_propagation() {
        let kernel = kernel();
        let functions = kernel.find_functions(["fun.joke", "fun.translate"]).unwrap();

        let mut input = Content::from_value("dinosaurs").with("language", "german");
        let response = kernel.call(&mut input, &functions).unwrap();

        assert_eq!(response.string_value(), "T[Translate into german: JOKE[dinosaurs]]");
        assert_eq!(response.predecessor(), Some(&input));
        assert_eq!(response.predecessor().unwrap().string_value(), "dinosaurs");
        assert_eq!(response.property("language"), Some(&Value::from("german")));
    }

    #[test]
    fn test_response_linked_to_restored_input() {
        let mut kernel = Kernel::new();
        let joke = Function::new(
            "joke",
            "Generate a funny joke",
            templated("fun.joke", "Tell a joke about {{value}}", "JOKE"),
        );
        kernel
            .add_skill(Skill::new("fun", "Funny skills").with_function(joke).unwrap())
            .unwrap();

        let mut input = Content::from_value("dinosaurs");
        let response = kernel.call_function("fun", "joke", &mut input).unwrap();

        assert_eq!(response.string_value(), "JOKE[Tell a joke about dinosaurs]");
        assert_eq!(input.string_value(), "dinosaurs");
        assert_eq!(response.predecessor(), Some(&input));
    }

    #[test]
    fn test_inherited_root_value_not_pinned() {
        let kernel = kernel();
        let mut input = Content::new().with_predecessor(Content::from_value("dinosaurs"));

        let response = kernel.call_function("fun", "joke", &mut input).unwrap();

        assert_eq!(response.string_value(), "JOKE[dinosaurs]");
        assert!(input.own_value().is_none());
        assert_eq!(input.string_value(), "dinosaurs");
        assert_eq!(response.predecessor(), Some(&input));
    }

    #[test]
    fn test_chain_restores_root_value() {
        let kernel = kernel();
        let functions = kernel.find_functions(["fun.joke", "fun.translate"]).unwrap();

        let mut input = Content::from_value("dinosaurs");
        kernel.call(&mut input, &functions).unwrap();

        assert_eq!(input.string_value(), "dinosaurs");
        assert_eq!(input.own_property("style"), Some(&Value::from("one-liner")));
        assert_eq!(input.own_property("language"), Some(&Value::from("english")));
    }

    #[test]
    fn test_chain_aborts_on_failure() {
        let kernel = kernel();
        let functions = kernel.find_functions(["fun.joke", "fun.fail", "fun.translate"]).unwrap();

        let mut input = Content::from_value("dinosaurs");
        let err = kernel.call(&mut input, &functions).unwrap_err();

        assert!(matches!(
            err,
            KernelError::GenerateFailed { ref function, source: GeneratorError::Backend(_) } if function == "fail"
        ));
        assert_eq!(input.string_value(), "dinosaurs");
        assert!(input.own_property("style").is_some());
        assert!(input.own_property("language").is_none());
    }

    #[test]
    fn test_chain_validation_failure() {
        let mut kernel = Kernel::new();
        kernel
            .add_skill(
                Skill::new("weather", "").with_function(
                    Function::new("forecast", "", templated("weather.forecast", "{{value}}", "W"))
                        .with_parameter("location.latitude", Parameter::new("Latitude").required())
                        .with_parameter("location.longitude", Parameter::new("Longitude").required()),
                )
                .unwrap(),
            )
            .unwrap();

        let mut input = Content::from_value("tomorrow");
        let err = kernel.call_function("weather", "forecast", &mut input).unwrap_err();
        assert_eq!(err.missing_parameters().len(), 2);
        assert!(err.is_validation());
    }

    #[test]
    fn test_empty_chain() {
        let kernel = kernel();
        let err = kernel.call(&mut Content::new(), &[]).unwrap_err();
        assert!(matches!(err, KernelError::EmptyChain));
    }

    #[test]
    fn test_register_skill_with_factory() {
        let mut kernel = kernel();
        kernel
            .register_skill(|kernel| {
                let generator = kernel.create_generator(&GeneratorConfig::new(ECHO_TYPE_ID).with("prefix", "echo: "))?;
                let prompt = PromptTemplate::parse("util.echo", "{{value}}")?;
                Skill::new("util", "Utilities")
                    .with_function(Function::new("echo", "Echo the input", TemplatedCall::new(prompt, generator)))
            })
            .unwrap();

        let response = kernel.call_function("util", "echo", &mut Content::from_value("ping")).unwrap();
        assert_eq!(response.string_value(), "echo: ping");
        assert_eq!(kernel.skills().count(), 2);
    }

    #[test]
    fn test_load_chat_skill() {
        let mut kernel = kernel();
        let definition = SkillDefinition::from_json(
            br#"{
                "name": "chat",
                "description": "Chat with the user",
                "generators": {
                    "default": {"typeID": "echo", "config": {"include_history": true}}
                },
                "functions": {
                    "chat": {
                        "description": "Answer the user",
                        "generator": "default",
                        "parameters": {
                            "botName": {"description": "Name of the bot", "default": "Ida"}
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let templates = SkillTemplates::new().with_system_prompt("chat", "You are {{botName}}.");
        kernel.load_skill(definition, &templates).unwrap();

        let mut first = Content::from_value("Hello").with_role(Role::User);
        let reply = kernel.call_function("chat", "chat", &mut first).unwrap();
        assert_eq!(reply.string_value(), "system: You are Ida.\nuser: Hello");

        let mut second = Content::from_value("Bye").with_role(Role::User).with_predecessor(reply);
        let reply = kernel.call_function("chat", "chat", &mut second).unwrap();

        let roles: Vec<Role> = reply.history().iter().map(|turn| turn.role()).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(reply.depth(), 5);
    }

    #[test]
    fn test_load_skill_unknown_generator_type() {
        let mut kernel = Kernel::new();
        let definition = SkillDefinition::from_toml(
            r#"
name = "fun"

[generators.default]
typeID = "gpt"
"#,
        )
        .unwrap();

        let err = kernel.load_skill(definition, &SkillTemplates::new()).unwrap_err();
        assert!(matches!(err, KernelError::GeneratorTypeUnknown(id) if id == "gpt"));
        assert!(kernel.find_skill("fun").is_err());
    }

    #[test]
    fn test_call_id_display() {
        let id = CallId::new();
        assert_eq!(id.to_string(), id.0.to_string());
        assert_ne!(CallId::new(), id);
    }
}
