//! The PostScript machine: operand stack, dictionary stack, graphics state
//! stack and the execution loop.

use crate::{
    dictionary::{DictionaryStackHelper, EpsDictionary},
    graphics::{
        node::GraphicTreeBuilder,
        pattern::{DefaultPatternActivator, PatternActivator},
        shading::{DefaultShadingManager, ShadingManager},
        trans::{DeviceRect, PatternToPageSpace, UserToPageSpace},
        BrushDescriptor, ColorPrecision, FillRule, GraphicGroup, GraphicPath, GraphicsState,
        GraphicsStateStack, PathGeometry, StrokeStyle,
    },
    operand::{ArrayRef, Command, DictRef, Operand, Value},
    parser::OperandSource,
    resource::ResourceManager,
    stack::Stack,
    MachineError, MachineOption, MachineResult, Name,
};
use log::{debug, error, warn};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

mod operators;

/// Dictionaries created at start. `system`, `global` and `user` are pushed
/// onto the dictionary stack in that order.
#[derive(Debug, Clone)]
pub struct StandardDictionaries {
    pub system: DictRef,
    pub global: DictRef,
    pub user: DictRef,
    pub error: DictRef,
    pub dollar_error: DictRef,
    pub status: DictRef,
    pub font: DictRef,
}

fn permanent_dict(d: EpsDictionary) -> DictRef {
    let mut r = EpsDictionary::new_permanent();
    for (k, v) in d.iter().cloned() {
        r.add(k, v);
    }
    Rc::new(RefCell::new(r))
}

impl StandardDictionaries {
    fn new(level: u8) -> Self {
        let empty = || permanent_dict(EpsDictionary::new());
        Self {
            system: permanent_dict(operators::system_dict(level)),
            global: empty(),
            user: empty(),
            error: permanent_dict(operators::error_dict()),
            dollar_error: empty(),
            status: empty(),
            font: empty(),
        }
    }
}

/// PostScript machine to execute operations.
pub struct Machine {
    option: Rc<MachineOption>,
    operands: Stack<Operand>,
    dict_stack: Stack<DictRef>,
    dicts: StandardDictionaries,
    resources: Rc<RefCell<ResourceManager>>,
    graphics: GraphicsStateStack,
    output: GraphicTreeBuilder,
    /// Nesting of `{`, while above zero only always-execute commands run.
    procedure_creation_level: usize,
    /// Nesting of `stopped`, `stop` is only allowed above zero.
    stopped_context_level: usize,
    exit_loop: bool,
    stop_procedure: bool,
    quit: bool,
    /// Set by `closefile` on the current file, ends the main loop.
    file_closed: bool,
    depth: usize,
    /// Operation count, shared with child machines.
    operations: Rc<Cell<u64>>,
    /// Dictionary stack depth at each active `save`.
    saves: Vec<usize>,
    global_allocation: bool,
    current_command: &'static str,
    pattern_activator: Rc<dyn PatternActivator>,
    shading_manager: Rc<dyn ShadingManager>,
}

impl Machine {
    pub fn new(option: MachineOption) -> Self {
        let dicts = StandardDictionaries::new(option.level());
        let mut dict_stack = Stack::new();
        dict_stack.push(dicts.system.clone());
        dict_stack.push(dicts.global.clone());
        dict_stack.push(dicts.user.clone());
        let graphics = GraphicsStateStack::new(GraphicsState::new(&option.page_box()));
        Self {
            option: Rc::new(option),
            operands: Stack::new(),
            dict_stack,
            dicts,
            resources: Rc::new(RefCell::new(ResourceManager::new())),
            graphics,
            output: GraphicTreeBuilder::new(),
            procedure_creation_level: 0,
            stopped_context_level: 0,
            exit_loop: false,
            stop_procedure: false,
            quit: false,
            file_closed: false,
            depth: 0,
            operations: Rc::new(Cell::new(0)),
            saves: vec![],
            global_allocation: false,
            current_command: "",
            pattern_activator: Rc::new(DefaultPatternActivator),
            shading_manager: Rc::new(DefaultShadingManager),
        }
    }

    pub fn with_pattern_activator(mut self, activator: Rc<dyn PatternActivator>) -> Self {
        self.pattern_activator = activator;
        self
    }

    pub fn with_shading_manager(mut self, manager: Rc<dyn ShadingManager>) -> Self {
        self.shading_manager = manager;
        self
    }

    /// Machine for nested content such as pattern cells. Shares dictionaries,
    /// resources and the operation budget, has its own operand stack,
    /// graphics state and output.
    pub fn child(&self, ctm: UserToPageSpace) -> MachineResult<Self> {
        if self.depth >= self.option.max_depth() {
            return Err(MachineError::RecursionTooDeep(self.option.max_depth()));
        }
        let mut state = GraphicsState::new(&self.option.page_box());
        state.set_ctm(ctm);
        Ok(Self {
            option: self.option.clone(),
            operands: Stack::new(),
            dict_stack: self.dict_stack.clone(),
            dicts: self.dicts.clone(),
            resources: self.resources.clone(),
            graphics: GraphicsStateStack::new(state),
            output: GraphicTreeBuilder::new(),
            procedure_creation_level: 0,
            stopped_context_level: 0,
            exit_loop: false,
            stop_procedure: false,
            quit: false,
            file_closed: false,
            depth: self.depth + 1,
            operations: self.operations.clone(),
            saves: vec![],
            global_allocation: self.global_allocation,
            current_command: "",
            pattern_activator: self.pattern_activator.clone(),
            shading_manager: self.shading_manager.clone(),
        })
    }

    pub fn option(&self) -> &MachineOption {
        &self.option
    }

    /// Pull operands from `source` and execute them until the source is
    /// exhausted or `quit` is executed.
    pub fn run(&mut self, source: &mut dyn OperandSource) -> MachineResult<()> {
        self.file_closed = false;
        while !self.quit && !self.file_closed {
            let Some(op) = source.next_operand()? else {
                break;
            };
            self.execute(op)?;
            if self.exit_loop {
                warn!("exit outside of any loop");
                self.exit_loop = false;
            }
        }
        if self.procedure_creation_level > 0 {
            warn!("unterminated procedure at end of input");
        }
        Ok(())
    }

    /// Execute one operand, as if read from the input.
    pub fn execute(&mut self, op: Operand) -> MachineResult<()> {
        self.count_operation()?;
        if self.procedure_creation_level > 0 {
            return match self.always_execute_command(&op) {
                Some(c) => self.invoke(c),
                None => {
                    self.push(op);
                    Ok(())
                }
            };
        }

        if !op.is_executable() {
            self.push(op);
            return Ok(());
        }
        match op.value() {
            Value::Name(n) => {
                let v = self.lookup(n)?;
                self.execute_bound(v)
            }
            Value::Command(c) => self.invoke(*c),
            // procedures read from input or inside a procedure are deferred
            _ => {
                self.push(op);
                Ok(())
            }
        }
    }

    /// Execute object as `exec` does, procedures are called.
    pub fn execute_object(&mut self, op: Operand) -> MachineResult<()> {
        if !op.is_executable() {
            self.push(op);
            return Ok(());
        }
        match op.value() {
            Value::Procedure(p) => {
                let p = p.clone();
                self.execute_procedure(&p)
            }
            _ => self.execute(op),
        }
    }

    pub fn execute_procedure(&mut self, proc: &ArrayRef) -> MachineResult<()> {
        self.count_operation()?;
        self.enter_nested()?;
        let r = self.execute_items(proc);
        self.leave_nested();
        r
    }

    fn execute_items(&mut self, proc: &ArrayRef) -> MachineResult<()> {
        // the procedure may redefine itself while running
        let items = proc.borrow().clone();
        for item in items {
            self.execute(item)?;
            if self.break_current_loop() {
                break;
            }
        }
        Ok(())
    }

    /// Value bound to executable name found.
    fn execute_bound(&mut self, v: Operand) -> MachineResult<()> {
        if !v.is_executable() {
            self.push(v);
            return Ok(());
        }
        match v.value() {
            Value::Command(c) => self.invoke(*c),
            Value::Procedure(p) => {
                let p = p.clone();
                self.execute_procedure(&p)
            }
            Value::Name(_) => {
                self.enter_nested()?;
                let r = self.execute(v);
                self.leave_nested();
                r
            }
            _ => {
                self.push(v);
                Ok(())
            }
        }
    }

    fn always_execute_command(&self, op: &Operand) -> Option<Command> {
        let c = match op.value() {
            Value::Command(c) => *c,
            Value::Name(n) if op.is_executable() => self
                .dict_stack
                .find_value(&Operand::from(n.clone()))?
                .opt_command_value()?,
            _ => return None,
        };
        c.always_execute().then_some(c)
    }

    fn invoke(&mut self, c: Command) -> MachineResult<()> {
        self.current_command = c.name();
        c.invoke(self)
    }

    fn count_operation(&self) -> MachineResult<()> {
        if let Some(limit) = self.option.max_operations() {
            let n = self.operations.get() + 1;
            self.operations.set(n);
            if n > limit {
                return Err(MachineError::ExecutionLimitExceeded(limit));
            }
        }
        Ok(())
    }

    /// Enter nested execution, fails if nested too deep.
    pub fn enter_nested(&mut self) -> MachineResult<()> {
        if self.depth >= self.option.max_depth() {
            error!("recursion too deep while executing {}", self.current_command);
            return Err(MachineError::RecursionTooDeep(self.option.max_depth()));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Loop operators stop iterating once this returns true.
    pub fn break_current_loop(&self) -> bool {
        self.exit_loop || self.stop_procedure || self.quit
    }

    /// Called by loop operators after their last iteration, consumes `exit`.
    fn end_loop(&mut self) {
        self.exit_loop = false;
    }

    /// Run `proc` as `stopped` does. Returns true if stopped by `stop` or by
    /// a non fatal error, the error is recorded in `$error`.
    pub fn stopped(&mut self, proc: Operand) -> MachineResult<bool> {
        self.stopped_context_level += 1;
        self.stop_procedure = false;
        let r = self.execute_object(proc);
        self.stopped_context_level -= 1;
        let stopped = std::mem::take(&mut self.stop_procedure);
        match r {
            Ok(()) => Ok(stopped),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("error caught by stopped: {e}, command: {}", self.current_command);
                self.record_error(&e);
                Ok(true)
            }
        }
    }

    fn stop(&mut self) -> MachineResult<()> {
        if self.stopped_context_level == 0 {
            return Err(MachineError::UnhandledStop);
        }
        self.stop_procedure = true;
        Ok(())
    }

    fn record_error(&self, e: &MachineError) {
        let mut d = self.dicts.dollar_error.borrow_mut();
        d.add("newerror".into(), true.into());
        d.add("errorname".into(), Operand::name(e.error_name()));
        d.add("command".into(), Operand::name(self.current_command));
    }

    fn lookup(&self, n: &Name) -> MachineResult<Operand> {
        self.dict_stack
            .find_value(&Operand::from(n.clone()))
            .ok_or_else(|| MachineError::Undefined(n.clone()))
    }

    pub fn push(&mut self, v: impl Into<Operand>) {
        self.operands.push(v.into());
    }

    pub fn pop(&mut self) -> MachineResult<Operand> {
        self.operands.pop()
    }

    pub fn top(&self) -> MachineResult<&Operand> {
        self.operands.top()
    }

    pub fn operand_stack(&self) -> &Stack<Operand> {
        &self.operands
    }

    pub fn truncate_operands(&mut self, len: usize) {
        self.operands.truncate(len);
    }

    /// Pop `n` operands, returned in stack order.
    pub fn pop_n(&mut self, n: usize) -> MachineResult<Vec<Operand>> {
        self.operands.pop_n(n)
    }

    fn pop_real(&mut self) -> MachineResult<f64> {
        self.pop()?.real()
    }

    fn pop_int(&mut self) -> MachineResult<i32> {
        self.pop()?.int()
    }

    fn pop_bool(&mut self) -> MachineResult<bool> {
        self.pop()?.bool()
    }

    /// Pop `(x, y)` pushed as `x y`.
    fn pop_xy(&mut self) -> MachineResult<(f64, f64)> {
        let y = self.pop_real()?;
        let x = self.pop_real()?;
        Ok((x, y))
    }

    fn pop_count(&mut self) -> MachineResult<usize> {
        usize::try_from(self.pop_int()?).map_err(|_| MachineError::RangeCheck)
    }

    /// Position of the topmost mark, counted from top.
    fn count_to_mark(&self) -> MachineResult<usize> {
        self.operands
            .iter()
            .rev()
            .position(Operand::is_mark)
            .ok_or(MachineError::UnMatchedMark)
    }

    /// Pop operands above the topmost mark and the mark itself.
    fn pop_to_mark(&mut self) -> MachineResult<Vec<Operand>> {
        let n = self.count_to_mark()?;
        let r = self.pop_n(n)?;
        self.pop()?;
        Ok(r)
    }

    pub fn dict_stack(&self) -> &Stack<DictRef> {
        &self.dict_stack
    }

    /// Dictionary on top of dictionary stack, where `def` defines.
    pub fn current_dict(&self) -> MachineResult<DictRef> {
        self.dict_stack.top().cloned()
    }

    pub fn dictionaries(&self) -> &StandardDictionaries {
        &self.dicts
    }

    pub fn resources(&self) -> &Rc<RefCell<ResourceManager>> {
        &self.resources
    }

    pub fn graphics(&self) -> &GraphicsStateStack {
        &self.graphics
    }

    pub fn graphics_mut(&mut self) -> &mut GraphicsStateStack {
        &mut self.graphics
    }

    fn gs(&self) -> &GraphicsState {
        self.graphics.current()
    }

    fn gs_mut(&mut self) -> &mut GraphicsState {
        self.graphics.current_mut()
    }

    pub fn shading_manager(&self) -> Rc<dyn ShadingManager> {
        self.shading_manager.clone()
    }

    /// Page box in device space.
    pub fn device_page_rect(&self) -> DeviceRect {
        self.gs()
            .page_to_device()
            .outer_transformed_box(&self.option.page_box())
    }

    /// Resolve pattern dictionary made by `makepattern` into a paint.
    pub fn activate_pattern(
        &mut self,
        pattern: &DictRef,
        underlying: Option<&BrushDescriptor>,
    ) -> MachineResult<(crate::graphics::pattern::PatternBrush, ColorPrecision)> {
        let matrix: PatternToPageSpace = pattern
            .borrow()
            .get_by_name("Implementation")
            .ok_or(MachineError::TypeCheck)?
            .try_into()?;
        let transform = matrix.then(self.gs().page_to_device());
        self.enter_nested()?;
        let activator = self.pattern_activator.clone();
        let r = activator.activate(self, pattern, &transform, underlying);
        self.leave_nested();
        r
    }

    /// Add current path to the output, filled and/or stroked, and start a
    /// new path.
    fn paint(&mut self, fill: Option<FillRule>, stroke: bool) {
        let gs = self.graphics.current_mut();
        let geometry = gs.take_path();
        if geometry.is_empty() {
            return;
        }
        let geometry = geometry.with_fill_rule(fill.unwrap_or_default());
        let Some(bounds) = geometry.bounds() else {
            return;
        };
        let scale = gs.device_scale();
        let (dash, dash_offset) = gs.dash();
        let stroke_style = stroke.then(|| StrokeStyle {
            brush: gs.stroke().brush(&bounds),
            width: gs.line_width() * scale,
            cap: gs.line_cap(),
            join: gs.line_join(),
            miter_limit: gs.miter_limit(),
            dash: dash.iter().map(|v| v * scale).collect(),
            dash_offset: dash_offset * scale,
        });
        let precision = match (fill.is_some(), stroke) {
            (true, true) => gs.fill().precision().worst(gs.stroke().precision()),
            (true, false) => gs.fill().precision(),
            _ => gs.stroke().precision(),
        };
        let path = GraphicPath {
            fill: fill.map(|_| gs.fill().brush(&bounds)),
            stroke: stroke_style,
            geometry,
            precision,
        };
        let clip = gs.clip().to_vec();
        let opacity = gs.opacity();
        self.output.add(path, &clip, opacity);
    }

    /// Add filled geometry with a prepared brush, as `shfill` does.
    fn paint_with(
        &mut self,
        geometry: PathGeometry,
        brush: crate::graphics::Brush,
        precision: ColorPrecision,
    ) {
        let gs = self.graphics.current();
        let clip = gs.clip().to_vec();
        let opacity = gs.opacity();
        self.output.add(
            GraphicPath {
                geometry,
                fill: Some(brush),
                stroke: None,
                precision,
            },
            &clip,
            opacity,
        );
    }

    /// Finish execution and return the graphic tree.
    pub fn finish(self) -> GraphicGroup {
        self.output.finish()
    }
}

/// Interpret all of `source` in a new machine and return its graphic tree.
/// No partial output is returned if execution fails.
pub fn interpret(
    option: MachineOption,
    source: &mut dyn OperandSource,
) -> MachineResult<GraphicGroup> {
    let mut m = Machine::new(option);
    m.run(source)?;
    Ok(m.finish())
}

#[cfg(test)]
mod tests;
