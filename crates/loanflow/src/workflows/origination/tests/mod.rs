mod common;
mod fraud;
mod routing;
