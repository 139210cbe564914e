pub mod query;
pub mod rest;

use crate::error::MessageBody;
use crate::models::context::ContextPointer;
use async_graphql::{EmptyMutation, EmptySubscription, Schema};
use async_graphql_rocket::{GraphQLQuery, GraphQLRequest, GraphQLResponse};
use query::QueryRoot;
use rocket::serde::json::Json;
use rocket::{Catcher, Route, State};

pub type ApiSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn get_context<'a>(context: &async_graphql::Context<'a>) -> &'a ContextPointer {
    context.data_unchecked::<ContextPointer>()
}

pub fn build_schema(context: ContextPointer) -> ApiSchema {
    Schema::build(QueryRoot::default(), EmptyMutation, EmptySubscription)
        .data(context)
        .finish()
}

#[rocket::post("/graphql", data = "<request>")]
async fn graphql_request(schema: &State<ApiSchema>, request: GraphQLRequest) -> GraphQLResponse {
    request.execute(schema.inner()).await
}

#[rocket::get("/graphql?<query..>")]
async fn graphql_query(schema: &State<ApiSchema>, query: GraphQLQuery) -> GraphQLResponse {
    query.execute(schema.inner()).await
}

pub fn routes() -> Vec<Route> {
    let mut routes = rocket::routes![graphql_request, graphql_query];
    routes.extend(rest::routes());
    routes
}

#[rocket::catch(400)]
fn bad_request() -> Json<MessageBody> {
    MessageBody::new("Malformed request")
}

#[rocket::catch(401)]
fn unauthorized() -> Json<MessageBody> {
    MessageBody::new("unauthorized")
}

#[rocket::catch(404)]
fn not_found() -> Json<MessageBody> {
    MessageBody::new("Route not found")
}

#[rocket::catch(422)]
fn unprocessable() -> Json<MessageBody> {
    MessageBody::new("Malformed request body")
}

#[rocket::catch(500)]
fn internal_error() -> Json<MessageBody> {
    MessageBody::new("Internal server error")
}

pub fn catchers() -> Vec<Catcher> {
    rocket::catchers![bad_request, unauthorized, not_found, unprocessable, internal_error]
}
