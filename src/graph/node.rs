//! Graph nodes and the state they operate on

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::core::Result;

/// State carried through a graph run.
///
/// Nodes never mutate the state directly; they return an update that the
/// runner applies once the node has finished.
pub trait GraphState: Send + Sync {
    /// Delta produced by one node
    type Update: Send;

    /// Fold a node's update into the state
    fn apply(&mut self, update: Self::Update);
}

/// A named step in a graph
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    async fn run(&self, state: &S) -> Result<S::Update>;
}

/// Node backed by a closure returning a boxed future
pub struct FnNode<F> {
    f: F,
}

impl<F> FnNode<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<S, F> Node<S> for FnNode<F>
where
    S: GraphState + 'static,
    F: for<'a> Fn(&'a S) -> BoxFuture<'a, Result<S::Update>> + Send + Sync,
{
    async fn run(&self, state: &S) -> Result<S::Update> {
        (self.f)(state).await
    }
}
