//! A theory bundles the symbol tables (predicates, function symbols,
//! constants, variables) with the axioms that refer to them.  Parsers
//! build theories through the `add_*` methods and never hand us raw
//! names: everything downstream works on dense indices.
//!
//! The equality predicate `=` is always predicate 0.  Asserting an
//! equality fact merges domain elements instead of only recording a
//! tuple, so equality atoms have a few more restrictions than other
//! atoms; `validate` enforces them, along with the usual range
//! restrictions of coherent logic.
mod axiom;

pub use axiom::Axiom;
pub use axiom::AxiomId;
pub use axiom::AxiomKind;
pub use axiom::Disjunct;

use crate::error::Error;
use crate::error::Result;
use crate::ground::Constant;
use crate::ground::FunctionId;
use crate::ground::PredicateId;
use crate::unification::Atom;
use crate::unification::MetaVar;
use crate::unification::Term;
#[cfg(test)]
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;

/// Name of the equality predicate.
pub const EQUALITY_NAME: &str = "=";

#[derive(Clone, Debug, Eq, PartialEq)]
struct Symbol {
    name: Arc<str>,
    arity: usize,
}

#[derive(Clone, Debug)]
pub struct Theory {
    predicates: Vec<Symbol>,
    predicate_index: HashMap<Arc<str>, PredicateId>,
    functions: Vec<Symbol>,
    function_index: HashMap<Arc<str>, FunctionId>,
    constants: Vec<Arc<str>>,
    constant_index: HashMap<Arc<str>, Constant>,
    variables: Vec<Arc<str>>,
    axioms: Vec<Axiom>,
}

impl Default for Theory {
    fn default() -> Self {
        Self::new()
    }
}

fn dense_id(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Theory("Symbol table overflow."))
}

impl Theory {
    /// Returns an empty theory, with only the equality predicate.
    #[must_use]
    pub fn new() -> Self {
        let mut ret = Self {
            predicates: Vec::new(),
            predicate_index: HashMap::new(),
            functions: Vec::new(),
            function_index: HashMap::new(),
            constants: Vec::new(),
            constant_index: HashMap::new(),
            variables: Vec::new(),
            axioms: Vec::new(),
        };

        let equality = ret
            .add_predicate(EQUALITY_NAME, 2)
            .expect("empty theory accepts equality");
        assert_eq!(equality, PredicateId::EQUALITY);
        ret
    }

    /// Registers the predicate `name` with `arity`, or returns the
    /// existing id for `name`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when `name` is already known with a different
    /// arity.
    pub fn add_predicate(&mut self, name: &str, arity: usize) -> Result<PredicateId> {
        if let Some(id) = self.predicate_index.get(name) {
            if self.predicates[id.index()].arity != arity {
                return Err(Error::Theory("Mismatched predicate arity."));
            }

            return Ok(*id);
        }

        let id = PredicateId::new(dense_id(self.predicates.len())?);
        let name: Arc<str> = name.into();
        self.predicates.push(Symbol {
            name: name.clone(),
            arity,
        });
        self.predicate_index.insert(name, id);
        Ok(id)
    }

    /// Registers the function symbol `name` with `arity`, or returns
    /// the existing id for `name`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when `name` is already known with a different
    /// arity.
    pub fn add_function(&mut self, name: &str, arity: usize) -> Result<FunctionId> {
        if let Some(id) = self.function_index.get(name) {
            if self.functions[id.index()].arity != arity {
                return Err(Error::Theory("Mismatched function arity."));
            }

            return Ok(*id);
        }

        let id = FunctionId::new(dense_id(self.functions.len())?);
        let name: Arc<str> = name.into();
        self.functions.push(Symbol {
            name: name.clone(),
            arity,
        });
        self.function_index.insert(name, id);
        Ok(id)
    }

    /// Registers the named constant `name`, or returns the existing
    /// constant with that name.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the constant table overflows.
    pub fn add_constant(&mut self, name: &str) -> Result<Constant> {
        if let Some(constant) = self.constant_index.get(name) {
            return Ok(*constant);
        }

        let constant = Constant::new(dense_id(self.constants.len())?);
        let name: Arc<str> = name.into();
        self.constants.push(name.clone());
        self.constant_index.insert(name, constant);
        Ok(constant)
    }

    /// Allocates a new variable slot.  Variables are identified by
    /// their slot, so calling this twice with the same name yields
    /// two distinct variables.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the variable table overflows.
    pub fn add_variable(&mut self, name: &str) -> Result<MetaVar> {
        let var = MetaVar::new(dense_id(self.variables.len())?);
        self.variables.push(name.into());
        Ok(var)
    }

    /// Appends `axiom` to the theory, and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the axiom table overflows.
    pub fn add_axiom(&mut self, axiom: Axiom) -> Result<AxiomId> {
        let id = AxiomId::new(dense_id(self.axioms.len())?);
        self.axioms.push(axiom);
        Ok(id)
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }

    #[must_use]
    pub fn axiom(&self, id: AxiomId) -> &Axiom {
        &self.axioms[id.index()]
    }

    #[must_use]
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    #[must_use]
    pub fn predicate_name(&self, id: PredicateId) -> &str {
        &self.predicates[id.index()].name
    }

    #[must_use]
    pub fn predicate_arity(&self, id: PredicateId) -> usize {
        self.predicates[id.index()].arity
    }

    #[must_use]
    pub fn predicate(&self, name: &str) -> Option<PredicateId> {
        self.predicate_index.get(name).copied()
    }

    #[must_use]
    pub fn function_name(&self, id: FunctionId) -> &str {
        &self.functions[id.index()].name
    }

    #[must_use]
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    #[must_use]
    pub fn constant(&self, name: &str) -> Option<Constant> {
        self.constant_index.get(name).copied()
    }

    /// Returns the name of a named constant, `None` for witnesses
    /// introduced during the search.
    #[must_use]
    pub fn constant_name(&self, constant: Constant) -> Option<&str> {
        self.constants.get(constant.index()).map(|name| &**name)
    }

    pub(crate) fn constant_names(&self) -> impl Iterator<Item = (Constant, &Arc<str>)> {
        self.constants
            .iter()
            .enumerate()
            .map(|(index, name)| (Constant::new(index as u32), name))
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn variable_name(&self, var: MetaVar) -> &str {
        &self.variables[var.index()]
    }

    /// Checks every axiom's shape.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for the first malformed axiom.
    pub fn validate(&self) -> Result<()> {
        for (index, axiom) in self.axioms.iter().enumerate() {
            self.validate_axiom(axiom)
                .map_err(|reason| Error::configuration(index, reason))?;
        }

        Ok(())
    }

    fn validate_axiom(&self, axiom: &Axiom) -> std::result::Result<(), &'static str> {
        match axiom.kind() {
            AxiomKind::Fact => {
                if !axiom.left().is_empty() {
                    return Err("Fact axiom with a non-empty left-hand side.");
                }

                if axiom.right().len() != 1 {
                    return Err("Fact axiom must derive exactly one conjunction.");
                }
            }
            AxiomKind::Goal => {
                if !axiom.right().is_empty() {
                    return Err("Goal axiom with a non-empty right-hand side.");
                }
            }
            AxiomKind::Normal => {}
        }

        for atom in axiom.left() {
            self.validate_atom(atom)?;
        }

        for disjunct in axiom.right() {
            for var in disjunct.existentials() {
                if axiom.left_vars().contains(var) {
                    return Err("Existential variable also matched on the left-hand side.");
                }
            }

            for atom in disjunct.atoms() {
                self.validate_atom(atom)?;

                // Derived equalities only merge constants; a matched
                // variable could carry a function term into one.
                if atom.is_equality()
                    && !self.functions.is_empty()
                    && atom.args.iter().any(|arg| match arg {
                        Term::Variable(var) => !disjunct.existentials().contains(var),
                        _ => false,
                    })
                {
                    return Err("Equality over a variable that may bind a function term.");
                }
            }

            if !disjunct.universals().is_subset(axiom.left_vars()) {
                return Err("Right-hand variable neither matched on the left nor existential.");
            }
        }

        Ok(())
    }

    fn validate_atom(&self, atom: &Atom) -> std::result::Result<(), &'static str> {
        let symbol = self
            .predicates
            .get(atom.predicate.index())
            .ok_or("Unknown predicate.")?;
        if symbol.arity != atom.arity() {
            return Err("Atom arity does not match its predicate.");
        }

        if atom.is_equality() && atom.args.iter().any(|arg| matches!(arg, Term::Function(..))) {
            return Err("Equality atom over function terms.");
        }

        for arg in &atom.args {
            self.validate_term(arg)?;
        }

        Ok(())
    }

    fn validate_term(&self, term: &Term) -> std::result::Result<(), &'static str> {
        match term {
            Term::Constant(c) => {
                if c.index() >= self.constants.len() {
                    return Err("Unknown constant.");
                }
            }
            Term::Variable(var) => {
                if var.index() >= self.variables.len() {
                    return Err("Unknown variable.");
                }
            }
            Term::Function(f, args) => {
                let symbol = self.functions.get(f.index()).ok_or("Unknown function.")?;
                if symbol.arity != args.len() {
                    return Err("Function term arity does not match its symbol.");
                }

                for arg in args {
                    self.validate_term(arg)?;
                }
            }
        }

        Ok(())
    }
}

#[test]
fn test_symbol_tables() {
    let mut theory = Theory::new();
    assert_eq!(theory.predicate(EQUALITY_NAME), Some(PredicateId::EQUALITY));

    let p = theory.add_predicate("p", 2).expect("ok");
    assert_eq!(theory.add_predicate("p", 2).expect("ok"), p);
    assert!(theory.add_predicate("p", 3).is_err());
    assert_eq!(theory.predicate_name(p), "p");
    assert_eq!(theory.predicate_arity(p), 2);

    let a = theory.add_constant("a").expect("ok");
    assert_eq!(theory.add_constant("a").expect("ok"), a);
    assert_eq!(theory.constant_name(a), Some("a"));
    assert_eq!(theory.constant_name(Constant::new(10)), None);

    let x1 = theory.add_variable("X").expect("ok");
    let x2 = theory.add_variable("X").expect("ok");
    assert_ne!(x1, x2);
    assert_eq!(theory.variable_name(x2), "X");

    let f = theory.add_function("f", 1).expect("ok");
    assert!(theory.add_function("f", 2).is_err());
    assert_eq!(theory.function_name(f), "f");
}

#[test]
fn test_validate_happy_path() {
    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let q = theory.add_predicate("q", 2).expect("ok");
    let a = theory.add_constant("a").expect("ok");
    let x = theory.add_variable("X").expect("ok");
    let y = theory.add_variable("Y").expect("ok");

    theory
        .add_axiom(Axiom::fact(vec![Atom::new(p, vec![Term::from(a)])]))
        .expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![Atom::new(p, vec![Term::from(x)])],
            vec![Disjunct::new(
                [y].iter().cloned().collect(),
                vec![Atom::new(q, vec![Term::from(x), Term::from(y)])],
            )],
        ))
        .expect("ok");

    theory.validate().expect("valid");
}

#[test]
fn test_validate_unbound_right_variable() {
    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let x = theory.add_variable("X").expect("ok");
    let y = theory.add_variable("Y").expect("ok");

    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![Atom::new(p, vec![Term::from(x)])],
            vec![Disjunct::conjunction(vec![Atom::new(p, vec![Term::from(y)])])],
        ))
        .expect("ok");

    match theory.validate() {
        Err(Error::Configuration { axiom, .. }) => assert_eq!(axiom, 0),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_validate_equality_shape() {
    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let f = theory.add_function("f", 1).expect("ok");
    let x = theory.add_variable("X").expect("ok");

    let bad_equality = Atom::new(
        PredicateId::EQUALITY,
        vec![Term::from(x), Term::function(f, vec![Term::from(x)])],
    );
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![Atom::new(p, vec![Term::from(x)])],
            vec![Disjunct::conjunction(vec![bad_equality])],
        ))
        .expect("ok");

    assert!(matches!(
        theory.validate(),
        Err(Error::Configuration { axiom: 0, .. })
    ));
}

#[test]
fn test_validate_equality_over_function_terms() {
    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let c = theory.add_constant("c").expect("ok");
    let x = theory.add_variable("X").expect("ok");
    let y = theory.add_variable("Y").expect("ok");

    // Without function symbols, `x` only ever binds a constant.
    let implication = |theory: &mut Theory, equality: Atom, existentials: BTreeSet<MetaVar>| {
        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![Atom::new(p, vec![Term::from(x)])],
                vec![Disjunct::new(existentials, vec![equality])],
            ))
            .expect("ok");
    };
    implication(
        &mut theory,
        Atom::new(PredicateId::EQUALITY, vec![Term::from(x), Term::from(c)]),
        BTreeSet::new(),
    );
    theory.validate().expect("valid");

    // Existential witnesses are always fresh constants.
    theory.add_function("f", 1).expect("ok");
    let mut witness = theory.clone();
    witness.axioms.clear();
    implication(
        &mut witness,
        Atom::new(PredicateId::EQUALITY, vec![Term::from(y), Term::from(c)]),
        [y].iter().cloned().collect(),
    );
    witness.validate().expect("valid");

    assert!(matches!(
        theory.validate(),
        Err(Error::Configuration { axiom: 0, .. })
    ));
}

#[test]
fn test_validate_kinds() {
    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 0).expect("ok");

    theory
        .add_axiom(Axiom::new(
            AxiomKind::Goal,
            vec![Atom::new(p, vec![])],
            vec![Disjunct::conjunction(vec![Atom::new(p, vec![])])],
        ))
        .expect("ok");
    assert!(theory.validate().is_err());

    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 0).expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Fact,
            vec![Atom::new(p, vec![])],
            vec![Disjunct::conjunction(vec![Atom::new(p, vec![])])],
        ))
        .expect("ok");
    assert!(theory.validate().is_err());
}
