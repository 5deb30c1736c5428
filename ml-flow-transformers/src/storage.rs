//! Transformers reading and writing the run's storage
//!
//! All four forward their input token unchanged; the storage mutation is the
//! side effect. Without a storage handler they fail with
//! [`Error::NoStorageHandler`].

use ml_flow_core::expression;
use ml_flow_core::options::resolve;
use ml_flow_core::{
    Error, FlowContext, OptionHandler, OptionHelp, OptionValue, OutputQueue, Payload, Result, Token, Transformer,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::math::{substitute_placeholder, PLACEHOLDER};

const DEFAULT_NAME: &str = "unknown";

fn default_name() -> OptionValue<String> {
    OptionValue::Value(DEFAULT_NAME.to_string())
}

const SET_HELP: &[OptionHelp] = &[OptionHelp::new(
    "storage_name",
    "The storage value name for storing the payload under (string).",
)];

const DELETE_HELP: &[OptionHelp] = &[OptionHelp::new(
    "storage_name",
    "The name of the storage value to delete (string).",
)];

const INIT_HELP: &[OptionHelp] = &[
    OptionHelp::new("storage_name", "The name of the storage value to initialize (string)."),
    OptionHelp::new("value", "The initial value, evaluated as an expression (string)."),
];

const UPDATE_HELP: &[OptionHelp] = &[
    OptionHelp::new("storage_name", "The name of the storage value to update (string)."),
    OptionHelp::new(
        "expression",
        "The expression computing the new value; {X} is replaced with the current value (string).",
    ),
];

/// Options of [`SetStorageValue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetStorageValueOptions {
    /// Name to store the payload under
    pub storage_name: OptionValue<String>,
}

impl Default for SetStorageValueOptions {
    fn default() -> Self {
        Self {
            storage_name: default_name(),
        }
    }
}

primitive_options!(SetStorageValueOptions, SET_HELP);

/// Options of [`DeleteStorageValue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteStorageValueOptions {
    /// Name of the value to delete
    pub storage_name: OptionValue<String>,
}

impl Default for DeleteStorageValueOptions {
    fn default() -> Self {
        Self {
            storage_name: default_name(),
        }
    }
}

primitive_options!(DeleteStorageValueOptions, DELETE_HELP);

/// Options of [`InitStorageValue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitStorageValueOptions {
    /// Name of the value to initialize
    pub storage_name: OptionValue<String>,

    /// Expression giving the initial value
    pub value: OptionValue<String>,
}

impl Default for InitStorageValueOptions {
    fn default() -> Self {
        Self {
            storage_name: default_name(),
            value: OptionValue::Value("1".to_string()),
        }
    }
}

primitive_options!(InitStorageValueOptions, INIT_HELP);

/// Options of [`UpdateStorageValue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateStorageValueOptions {
    /// Name of the value to update
    pub storage_name: OptionValue<String>,

    /// Expression over the current value
    pub expression: OptionValue<String>,
}

impl Default for UpdateStorageValueOptions {
    fn default() -> Self {
        Self {
            storage_name: default_name(),
            expression: OptionValue::Value(format!("int({} + 1)", PLACEHOLDER)),
        }
    }
}

primitive_options!(UpdateStorageValueOptions, UPDATE_HELP);

/// Stores the payload of the current token under a name
#[derive(Debug, Clone, Default)]
pub struct SetStorageValue {
    options: SetStorageValueOptions,
}

impl SetStorageValue {
    /// Kind name
    pub const KIND: &'static str = "SetStorageValue";

    /// Create the transformer
    pub fn new(options: SetStorageValueOptions) -> Self {
        Self { options }
    }
}

impl Transformer for SetStorageValue {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Store the payload of the current token in internal storage using the specified name."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!("name: {}", self.options.storage_name))
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        SetStorageValueOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let name = resolve(ctx, "storage_name", &self.options.storage_name)?;
        ctx.storage_mut()?.set(name, input.payload().clone());
        output.push(input.clone());
        Ok(())
    }
}

/// Removes a value from the storage
#[derive(Debug, Clone, Default)]
pub struct DeleteStorageValue {
    options: DeleteStorageValueOptions,
}

impl DeleteStorageValue {
    /// Kind name
    pub const KIND: &'static str = "DeleteStorageValue";

    /// Create the transformer
    pub fn new(options: DeleteStorageValueOptions) -> Self {
        Self { options }
    }
}

impl Transformer for DeleteStorageValue {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Deletes the specified value from internal storage."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!("name: {}", self.options.storage_name))
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        DeleteStorageValueOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let name = resolve(ctx, "storage_name", &self.options.storage_name)?;
        ctx.storage_mut()?.delete(&name);
        output.push(input.clone());
        Ok(())
    }
}

/// Sets a storage value to the result of an expression
#[derive(Debug, Clone, Default)]
pub struct InitStorageValue {
    options: InitStorageValueOptions,
}

impl InitStorageValue {
    /// Kind name
    pub const KIND: &'static str = "InitStorageValue";

    /// Create the transformer
    pub fn new(options: InitStorageValueOptions) -> Self {
        Self { options }
    }
}

impl Transformer for InitStorageValue {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Initializes the storage value with the provided value (evaluated as an arithmetic expression)."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!(
            "name: {}, value: {}",
            self.options.storage_name, self.options.value
        ))
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        InitStorageValueOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        if !ctx.has_storage() {
            return Err(Error::NoStorageHandler);
        }
        let name = resolve(ctx, "storage_name", &self.options.storage_name)?;
        let value = expression::evaluate(&resolve(ctx, "value", &self.options.value)?)?;
        debug!(name = %name, value = %value, "initializing storage value");
        ctx.storage_mut()?.set(name, Payload::from(value));
        output.push(input.clone());
        Ok(())
    }
}

/// Replaces a storage value with an expression over its current value
#[derive(Debug, Clone, Default)]
pub struct UpdateStorageValue {
    options: UpdateStorageValueOptions,
}

impl UpdateStorageValue {
    /// Kind name
    pub const KIND: &'static str = "UpdateStorageValue";

    /// Create the transformer
    pub fn new(options: UpdateStorageValueOptions) -> Self {
        Self { options }
    }
}

impl Transformer for UpdateStorageValue {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Updates the specified storage value using the expression. The current value is available \
         through the placeholder {X} in the expression."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!(
            "name: {}, expression: {}",
            self.options.storage_name, self.options.expression
        ))
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        UpdateStorageValueOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let name = resolve(ctx, "storage_name", &self.options.storage_name)?;
        let template = resolve(ctx, "expression", &self.options.expression)?;

        let current = ctx
            .storage()?
            .get(&name)
            .ok_or_else(|| Error::Execution(format!("Storage value '{}' not present!", name)))?;
        let value = expression::evaluate(&substitute_placeholder(&template, current))?;

        debug!(name = %name, value = %value, "updating storage value");
        ctx.storage_mut()?.set(name, Payload::from(value));
        output.push(input.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_flow_core::{Actor, Storage};

    fn run(actor: &mut Actor, ctx: &mut FlowContext, token: Token) -> Result<Token> {
        actor.input(token)?;
        actor.execute(ctx)?;
        actor
            .output()
            .ok_or_else(|| Error::Execution("no output".into()))
    }

    fn named(name: &str) -> OptionValue<String> {
        OptionValue::Value(name.to_string())
    }

    #[test]
    fn test_set_and_delete() {
        let mut ctx = FlowContext::new();
        let mut set = Actor::new(
            "set",
            Box::new(SetStorageValue::new(SetStorageValueOptions {
                storage_name: named("x"),
            })),
        );
        let mut delete = Actor::new(
            "delete",
            Box::new(DeleteStorageValue::new(DeleteStorageValueOptions {
                storage_name: named("x"),
            })),
        );

        let forwarded = run(&mut set, &mut ctx, Token::new("hello")).unwrap();
        assert_eq!(forwarded.payload().as_text(), Some("hello"));
        assert_eq!(ctx.storage().unwrap().get("x").and_then(Payload::as_text), Some("hello"));

        run(&mut delete, &mut ctx, Token::new(1_i64)).unwrap();
        assert!(!ctx.storage().unwrap().contains("x"));
        // deleting again is fine
        run(&mut delete, &mut ctx, Token::new(1_i64)).unwrap();
    }

    #[test]
    fn test_init_then_update_counts_up() {
        let mut ctx = FlowContext::with_storage(Storage::new());
        let mut init = Actor::new(
            "init",
            Box::new(InitStorageValue::new(InitStorageValueOptions {
                storage_name: named("i"),
                ..Default::default()
            })),
        );
        let mut update = Actor::new(
            "update",
            Box::new(UpdateStorageValue::new(UpdateStorageValueOptions {
                storage_name: named("i"),
                ..Default::default()
            })),
        );

        run(&mut init, &mut ctx, Token::new(0_i64)).unwrap();
        assert_eq!(ctx.storage().unwrap().get("i").and_then(Payload::as_i64), Some(1));
        for expected in [2, 3] {
            run(&mut update, &mut ctx, Token::new(0_i64)).unwrap();
            assert_eq!(ctx.storage().unwrap().get("i").and_then(Payload::as_i64), Some(expected));
        }
    }

    #[test]
    fn test_update_requires_existing_value() {
        let mut ctx = FlowContext::new();
        let mut update = Actor::new("update", Box::new(UpdateStorageValue::default()));
        let err = run(&mut update, &mut ctx, Token::new(0_i64)).unwrap_err();
        assert_eq!(err.to_string(), "Storage value 'unknown' not present!");
    }

    #[test]
    fn test_without_storage_handler() {
        let mut ctx = FlowContext::without_storage();
        let transformers: Vec<Box<dyn Transformer>> = vec![
            Box::new(SetStorageValue::default()),
            Box::new(DeleteStorageValue::default()),
            Box::new(InitStorageValue::default()),
            Box::new(UpdateStorageValue::default()),
        ];
        for transformer in transformers {
            let mut actor = Actor::new("storage", transformer);
            let err = run(&mut actor, &mut ctx, Token::new(1_i64)).unwrap_err();
            assert!(matches!(err, Error::NoStorageHandler), "{}", err);
            assert_eq!(err.to_string(), "No storage handler available!");
        }
    }

    #[test]
    fn test_float_results_stay_floats() {
        let mut ctx = FlowContext::new();
        let mut init = Actor::new(
            "init",
            Box::new(InitStorageValue::new(InitStorageValueOptions {
                storage_name: named("rate"),
                value: named("1 / 4"),
            })),
        );
        run(&mut init, &mut ctx, Token::new(0_i64)).unwrap();
        assert!(matches!(ctx.storage().unwrap().get("rate"), Some(Payload::Number(v)) if (*v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_quickinfo() {
        assert_eq!(SetStorageValue::default().quickinfo().unwrap(), "name: unknown");
        assert_eq!(
            UpdateStorageValue::default().quickinfo().unwrap(),
            "name: unknown, expression: int({X} + 1)"
        );
    }
}
