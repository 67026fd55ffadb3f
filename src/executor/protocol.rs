//! Queue server wire protocol
//!
//! One JSON document per line in each direction over a local socket. The
//! client is blocking: worker processes run tests synchronously and only
//! talk to the server between tests.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use super::WorkItem;
use crate::error::LoupeError;
use crate::models::Reporter;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    Pop,
    IsEmpty,
    Length,
    AddReporter(Reporter),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Item(Option<WorkItem>),
    Empty(bool),
    Length(usize),
    Ack,
}

/// Connection to a queue server
pub struct Client {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Client {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, LoupeError> {
        let stream = UnixStream::connect(path.as_ref())?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: stream,
        })
    }

    /// Next work item; `None` once the queue is drained
    pub fn pop(&mut self) -> Result<Option<WorkItem>, LoupeError> {
        match self.call(&Request::Pop)? {
            Response::Item(item) => Ok(item),
            other => Err(unexpected(other)),
        }
    }

    pub fn is_empty(&mut self) -> Result<bool, LoupeError> {
        match self.call(&Request::IsEmpty)? {
            Response::Empty(empty) => Ok(empty),
            other => Err(unexpected(other)),
        }
    }

    pub fn length(&mut self) -> Result<usize, LoupeError> {
        match self.call(&Request::Length)? {
            Response::Length(length) => Ok(length),
            other => Err(unexpected(other)),
        }
    }

    /// Hand a partial reporter to the server for merging
    pub fn add_reporter(&mut self, reporter: Reporter) -> Result<(), LoupeError> {
        match self.call(&Request::AddReporter(reporter))? {
            Response::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn call(&mut self, request: &Request) -> Result<Response, LoupeError> {
        let mut payload = serde_json::to_vec(request)?;
        payload.push(b'\n');
        self.writer.write_all(&payload)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(LoupeError::Protocol("server closed the connection".into()));
        }
        Ok(serde_json::from_str(&line)?)
    }
}

fn unexpected(response: Response) -> LoupeError {
    LoupeError::Protocol(format!("unexpected response {response:?}"))
}
