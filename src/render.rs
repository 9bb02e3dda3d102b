//! Debug rendering of nodes, as a single line or as a `ptree` expression tree.

use std::borrow::Cow;
use std::fmt;
use std::io;

use ptree::style::Style;
use ptree::TreeItem;

use crate::{Graph, ScalarId, ScalarOp};

/// A node borrowed together with the graph it lives in.
#[derive(Clone, Copy)]
pub struct ScalarView<'g> {
    graph: &'g Graph,
    id: ScalarId,
}

impl Graph {
    pub fn view(&self, id: ScalarId) -> ScalarView<'_> {
        ScalarView { graph: self, id }
    }
}

impl<'g> ScalarView<'g> {
    pub fn id(&self) -> ScalarId {
        self.id
    }
}

impl fmt::Display for ScalarView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let val = self.graph.value(self.id);
        let grad = self.graph.grad(self.id);
        match self.graph.op(self.id) {
            ScalarOp::Leaf => write!(f, "Val({}; Δ{})", val, grad),
            op => write!(f, "Val({}; Δ{})<- {}", val, grad, op),
        }
    }
}

impl fmt::Debug for ScalarView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self)
    }
}

impl<'g> TreeItem for ScalarView<'g> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, style: &Style) -> io::Result<()> {
        write!(f, "{}", style.paint(self))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        let childs: Vec<_> = self
            .graph
            .operands(self.id)
            .iter()
            .map(|&id| self.graph.view(id))
            .collect();

        Cow::from(childs)
    }
}
