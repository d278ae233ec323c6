use crate::binding::{Binding, BindingConfig, BindingContext, BindingHooks, CmdFactory};
use crate::command::Command;
use crate::error::BindError;
use crate::interaction::{Interaction, InteractionData};
use crate::logging::LogLevel;
use crate::source::NodeId;

/// Step-by-step assembly of a [`Binding`].
///
/// ```ignore
/// let binding = Binder::new(&ctx, gestures::button_pressed(&tree)?)
///     .on(button)
///     .to_produce(|_| Ok(AnonCmd::new(|| println!("clicked"))))
///     .bind()?;
/// ```
pub struct Binder<C, D> {
    ctx: BindingContext,
    interaction: Interaction<D>,
    factory: Option<CmdFactory<C, D>>,
    hooks: BindingHooks<C, D>,
    config: BindingConfig,
    nodes: Vec<NodeId>,
    observed: Vec<NodeId>,
}

impl<C: Command, D: InteractionData + 'static> Binder<C, D> {
    pub fn new(ctx: &BindingContext, interaction: Interaction<D>) -> Self {
        let config = BindingConfig {
            name: interaction.name(),
            ..BindingConfig::default()
        };
        Self {
            ctx: ctx.clone(),
            interaction,
            factory: None,
            hooks: BindingHooks::default(),
            config,
            nodes: Vec::new(),
            observed: Vec::new(),
        }
    }

    pub fn to_produce(mut self, factory: impl Fn(&D) -> anyhow::Result<C> + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn on(mut self, node: NodeId) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn on_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Binds to every node under `root`, including ones added later.
    pub fn on_dynamic(mut self, root: NodeId) -> Self {
        self.observed.push(root);
        self
    }

    pub fn when(mut self, when: impl Fn(&D) -> bool + 'static) -> Self {
        self.hooks.when = Some(Box::new(when));
        self
    }

    pub fn first(mut self, hook: impl Fn(&mut C, &D) + 'static) -> Self {
        self.hooks.first = Some(Box::new(hook));
        self
    }

    pub fn then(mut self, hook: impl Fn(&mut C, &D) + 'static) -> Self {
        self.hooks.then = Some(Box::new(hook));
        self
    }

    pub fn end(mut self, hook: impl Fn(&mut C, &D) + 'static) -> Self {
        self.hooks.end = Some(Box::new(hook));
        self
    }

    pub fn cancel(mut self, hook: impl Fn(&D) + 'static) -> Self {
        self.hooks.cancel = Some(Box::new(hook));
        self
    }

    pub fn end_or_cancel(mut self, hook: impl Fn(&D) + 'static) -> Self {
        self.hooks.end_or_cancel = Some(Box::new(hook));
        self
    }

    pub fn if_had_effects(mut self, hook: impl Fn(&mut C, &D) + 'static) -> Self {
        self.hooks.had_effects = Some(Box::new(hook));
        self
    }

    pub fn if_had_no_effect(mut self, hook: impl Fn(&mut C, &D) + 'static) -> Self {
        self.hooks.had_no_effect = Some(Box::new(hook));
        self
    }

    pub fn if_cannot_execute(mut self, hook: impl Fn(&mut C, &D) + 'static) -> Self {
        self.hooks.cannot_execute = Some(Box::new(hook));
        self
    }

    pub fn continuous_execution(mut self) -> Self {
        self.config.continuous_execution = true;
        self
    }

    pub fn strict_start(mut self) -> Self {
        self.config.strict_start = true;
        self
    }

    pub fn log(mut self, level: LogLevel) -> Self {
        if !self.config.log_levels.contains(&level) {
            self.config.log_levels.push(level);
        }
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Replaces every option set so far, name included.
    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(self) -> Result<Binding<C, D>, BindError> {
        let factory = self.factory.ok_or(BindError::MissingFactory)?;
        let mut config = self.config;
        if config.log_levels.is_empty() {
            config.log_levels = self.ctx.log_levels.clone();
        }
        let binding = Binding::new(self.ctx, self.interaction, factory, self.hooks, config);
        binding.interaction().register_to_nodes(self.nodes);
        for root in self.observed {
            binding.interaction().register_to_observed(root);
        }
        Ok(binding)
    }
}
