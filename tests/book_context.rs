//! BookContext integration tests.
//!
//! Run with: cargo test --test book_context
//!
//! Each test gets its own in-memory SQLite database.

use chrono::NaiveDate;

use bookstore_data::entities::{Author, Book, BookAuthor, LineItem, Order, PriceOffer};
use bookstore_data::{
    BookContext, ContextError, ContextOptions, DataKey, DataKeyService, FixedDataKeyService,
};

async fn connect_and_create() -> ContextOptions {
    let options = ContextOptions::in_memory()
        .await
        .expect("Failed to open in-memory SQLite");

    BookContext::new(options.clone(), None)
        .ensure_created()
        .await
        .expect("Failed to create schema");

    options
}

fn context_for(options: &ContextOptions, key: DataKey) -> BookContext {
    let service = FixedDataKeyService::new(key);
    BookContext::new(options.clone(), Some(&service as &dyn DataKeyService))
}

fn book(title: &str) -> Book {
    Book::new(
        title,
        NaiveDate::from_ymd_opt(2020, 7, 1).expect("valid date"),
        25.0,
    )
}

/// A book with one order line referencing it, owned by the context's key.
async fn book_on_order(ctx: &BookContext) -> (Book, Order) {
    let book = ctx.books().add(book("Ordered")).await.expect("add book");
    let order = ctx
        .orders()
        .add(Order::new(ctx.data_key()))
        .await
        .expect("add order");
    ctx.line_items()
        .add(LineItem::new(order.order_id, book.book_id, 1, 2, book.price))
        .await
        .expect("add line item");
    (book, order)
}

#[tokio::test]
async fn test_contexts_without_service_get_distinct_keys() {
    let options = connect_and_create().await;

    let first = BookContext::new(options.clone(), None);
    let second = BookContext::new(options, None);

    assert_ne!(first.data_key(), second.data_key());
}

#[tokio::test]
async fn test_context_uses_service_key() {
    let options = connect_and_create().await;
    let key = DataKey::new_random();
    let service = FixedDataKeyService::new(key);

    let ctx = BookContext::new(options, Some(&service as &dyn DataKeyService));

    assert_eq!(ctx.data_key(), key);
    assert_eq!(ctx.data_key(), service.get_data_key());
}

#[tokio::test]
async fn test_ensure_created_is_idempotent() {
    let options = connect_and_create().await;
    let ctx = BookContext::new(options, None);

    ctx.ensure_created().await.expect("second ensure_created");
    assert_eq!(ctx.books().query().count().await.expect("count"), 0);
}

#[tokio::test]
async fn test_duplicate_book_author_pair_is_rejected() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let book = ctx.books().add(book("Domain-Driven Design")).await.expect("add book");
    let author = ctx.authors().add(Author::new("Eric Evans")).await.expect("add author");

    ctx.book_authors()
        .add(BookAuthor::new(book.book_id, author.author_id, 0))
        .await
        .expect("first link");

    let err = ctx
        .book_authors()
        .add(BookAuthor::new(book.book_id, author.author_id, 1))
        .await
        .expect_err("duplicate link must fail");

    assert!(
        matches!(err, ContextError::DuplicateKey { entity: "BookAuthor", .. }),
        "unexpected error: {err}"
    );
    assert_eq!(ctx.book_authors().query().count().await.expect("count"), 1);
}

#[tokio::test]
async fn test_same_author_on_two_books_is_allowed() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let first = ctx.books().add(book("First")).await.expect("add book");
    let second = ctx.books().add(book("Second")).await.expect("add book");
    let author = ctx.authors().add(Author::new("Author")).await.expect("add author");

    ctx.book_authors()
        .add(BookAuthor::new(first.book_id, author.author_id, 0))
        .await
        .expect("first link");
    ctx.book_authors()
        .add(BookAuthor::new(second.book_id, author.author_id, 0))
        .await
        .expect("second link");

    let titles: Vec<String> = ctx
        .books()
        .by_author(author.author_id)
        .to_list()
        .await
        .expect("by author")
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

#[tokio::test]
async fn test_book_delete_restricted_by_line_item() {
    let ctx = context_for(&connect_and_create().await, DataKey::new_random());
    let (book, _order) = book_on_order(&ctx).await;

    let err = ctx
        .books()
        .remove(book.book_id)
        .await
        .expect_err("delete must be restricted");

    match err {
        ContextError::RestrictedDelete {
            entity,
            referenced_by,
            ..
        } => {
            assert_eq!(entity, "Book");
            assert_eq!(referenced_by, "LineItem");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(ctx.books().find(book.book_id).await.expect("find").is_some());
}

#[tokio::test]
async fn test_book_without_line_items_can_be_deleted() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let book = ctx.books().add(book("Unsold")).await.expect("add book");
    let author = ctx.authors().add(Author::new("Writer")).await.expect("add author");
    ctx.book_authors()
        .add(BookAuthor::new(book.book_id, author.author_id, 0))
        .await
        .expect("link");
    ctx.price_offers()
        .add(PriceOffer::new(book.book_id, 10.0, "Half price"))
        .await
        .expect("offer");

    ctx.books().remove(book.book_id).await.expect("delete book");

    assert!(ctx.books().find(book.book_id).await.expect("find").is_none());
    assert_eq!(ctx.book_authors().query().count().await.expect("count"), 0);
    assert_eq!(ctx.price_offers().query().count().await.expect("count"), 0);
    assert_eq!(ctx.authors().query().count().await.expect("count"), 1);
}

#[tokio::test]
async fn test_deleting_order_releases_book() {
    let ctx = context_for(&connect_and_create().await, DataKey::new_random());
    let (book, order) = book_on_order(&ctx).await;

    ctx.orders().remove(order.order_id).await.expect("delete order");
    assert_eq!(ctx.line_items().query().count().await.expect("count"), 0);

    ctx.books().remove(book.book_id).await.expect("delete book");
}

#[tokio::test]
async fn test_soft_deleted_book_hidden_unless_filters_ignored() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let kept = ctx.books().add(book("Kept")).await.expect("add book");
    let hidden = ctx.books().add(book("Hidden")).await.expect("add book");

    ctx.books().soft_delete(hidden.book_id).await.expect("soft delete");

    let visible = ctx.books().query().to_list().await.expect("list");
    assert_eq!(visible, vec![kept.clone()]);
    assert!(ctx.books().find(hidden.book_id).await.expect("find").is_none());

    let all = ctx
        .books()
        .query()
        .ignore_query_filters()
        .to_list()
        .await
        .expect("list all");
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|b| b.book_id == hidden.book_id && b.soft_deleted));

    let found = ctx
        .books()
        .ignore_query_filters()
        .find(hidden.book_id)
        .await
        .expect("find bypassed");
    assert!(found.is_some());
}

#[tokio::test]
async fn test_soft_deleted_book_can_be_restored_by_update() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let mut book = ctx.books().add(book("Returning")).await.expect("add book");
    ctx.books().soft_delete(book.book_id).await.expect("soft delete");
    ctx.books().soft_delete(book.book_id).await.expect("soft delete again");
    assert_eq!(ctx.books().query().count().await.expect("count"), 0);

    book.soft_deleted = false;
    ctx.books().update(&book).await.expect("restore");
    assert_eq!(ctx.books().query().count().await.expect("count"), 1);
}

#[tokio::test]
async fn test_soft_deleted_book_delete_still_restricted_by_line_item() {
    let ctx = context_for(&connect_and_create().await, DataKey::new_random());
    let (book, _order) = book_on_order(&ctx).await;
    ctx.books().soft_delete(book.book_id).await.expect("soft delete");

    let err = ctx
        .books()
        .remove(book.book_id)
        .await
        .expect_err("delete must be restricted");
    assert!(matches!(
        err,
        ContextError::RestrictedDelete {
            entity: "Book",
            ref referenced_by,
            ..
        } if referenced_by == "LineItem"
    ));

    let stored = ctx
        .books()
        .ignore_query_filters()
        .find(book.book_id)
        .await
        .expect("find bypassed");
    assert!(stored.is_some_and(|b| b.soft_deleted));
}

#[tokio::test]
async fn test_soft_deleted_book_without_line_items_can_be_removed() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let book = ctx.books().add(book("Pulped")).await.expect("add book");
    ctx.books().soft_delete(book.book_id).await.expect("soft delete");

    ctx.books().remove(book.book_id).await.expect("remove");
    let left = ctx
        .books()
        .query()
        .ignore_query_filters()
        .count()
        .await
        .expect("count all");
    assert_eq!(left, 0);
}

#[tokio::test]
async fn test_orders_scoped_to_data_key() {
    let options = connect_and_create().await;
    let key_a = DataKey::new_random();
    let key_b = DataKey::new_random();

    let ctx_a = context_for(&options, key_a);
    let ctx_b = context_for(&options, key_b);

    let order_a = ctx_a.orders().add(Order::new(key_a)).await.expect("add order a");
    let order_b = ctx_b.orders().add(Order::new(key_b)).await.expect("add order b");

    let seen_by_a = ctx_a.orders().query().to_list().await.expect("list a");
    assert_eq!(seen_by_a.len(), 1);
    assert_eq!(seen_by_a[0].order_id, order_a.order_id);
    assert_eq!(seen_by_a[0].customer_name, key_a);

    assert!(ctx_a.orders().find(order_b.order_id).await.expect("find").is_none());
    assert_eq!(
        ctx_a
            .orders()
            .query()
            .ignore_query_filters()
            .count()
            .await
            .expect("count all"),
        2
    );
}

#[tokio::test]
async fn test_other_tenants_order_cannot_be_removed() {
    let options = connect_and_create().await;
    let owner = context_for(&options, DataKey::new_random());
    let other = context_for(&options, DataKey::new_random());

    let order = owner
        .orders()
        .add(Order::new(owner.data_key()))
        .await
        .expect("add order");

    let err = other
        .orders()
        .remove(order.order_id)
        .await
        .expect_err("other tenant must not see order");
    assert!(matches!(err, ContextError::NotFound { entity: "Order", .. }));
    assert!(owner.orders().find(order.order_id).await.expect("find").is_some());
}

#[tokio::test]
async fn test_other_tenants_order_cannot_be_updated() {
    let options = connect_and_create().await;
    let owner = context_for(&options, DataKey::new_random());
    let other = context_for(&options, DataKey::new_random());

    let mut order = owner
        .orders()
        .add(Order::new(owner.data_key()))
        .await
        .expect("add order");

    order.customer_name = other.data_key();
    let err = other
        .orders()
        .update(&order)
        .await
        .expect_err("other tenant must not claim order");
    assert!(matches!(err, ContextError::NotFound { entity: "Order", .. }));
    assert!(owner.orders().find(order.order_id).await.expect("find").is_some());
}

#[tokio::test]
async fn test_line_items_follow_order_visibility() {
    let options = connect_and_create().await;
    let owner = context_for(&options, DataKey::new_random());
    let other = context_for(&options, DataKey::new_random());
    let (_book, order) = book_on_order(&owner).await;

    let own_lines = owner
        .line_items()
        .for_order(order.order_id)
        .to_list()
        .await
        .expect("own lines");
    assert_eq!(own_lines.len(), 1);
    assert_eq!(own_lines[0].num_books, 2);

    let foreign_lines = other
        .line_items()
        .for_order(order.order_id)
        .to_list()
        .await
        .expect("foreign lines");
    assert!(foreign_lines.is_empty());

    let bypassed = other
        .line_items()
        .for_order(order.order_id)
        .ignore_query_filters()
        .count()
        .await
        .expect("bypassed count");
    assert_eq!(bypassed, 1);
}

#[tokio::test]
async fn test_navigation_reads_hide_soft_deleted_books() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let author = ctx.authors().add(Author::new("Prolific")).await.expect("add author");
    let live = ctx.books().add(book("Live")).await.expect("add book");
    let gone = ctx.books().add(book("Gone")).await.expect("add book");

    for (order, b) in [(0, &gone), (1, &live)] {
        ctx.book_authors()
            .add(BookAuthor::new(b.book_id, author.author_id, order))
            .await
            .expect("link");
    }
    ctx.price_offers()
        .add(PriceOffer::new(gone.book_id, 5.0, "Clearance"))
        .await
        .expect("offer");

    ctx.books().soft_delete(gone.book_id).await.expect("soft delete");

    let books = ctx
        .books()
        .by_author(author.author_id)
        .to_list()
        .await
        .expect("by author");
    assert_eq!(books, vec![live]);

    let offers = ctx
        .price_offers()
        .for_book(gone.book_id)
        .to_list()
        .await
        .expect("offers");
    assert!(offers.is_empty());

    let all_books = ctx
        .books()
        .by_author(author.author_id)
        .ignore_query_filters()
        .to_list()
        .await
        .expect("by author, unfiltered");
    let titles: Vec<&str> = all_books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Gone", "Live"]);
}

#[tokio::test]
async fn test_remove_missing_key_is_not_found() {
    let ctx = BookContext::new(connect_and_create().await, None);

    let err = ctx
        .authors()
        .remove(4242)
        .await
        .expect_err("nothing to delete");
    assert!(matches!(err, ContextError::NotFound { entity: "Author", .. }));
}

#[tokio::test]
async fn test_line_item_for_missing_book_is_foreign_key_error() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let order = ctx
        .orders()
        .add(Order::new(ctx.data_key()))
        .await
        .expect("add order");

    let err = ctx
        .line_items()
        .add(LineItem::new(order.order_id, 999, 1, 1, 1.0))
        .await
        .expect_err("missing book");
    assert!(
        matches!(err, ContextError::ForeignKey { entity: "LineItem", .. }),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_update_round_trips_columns() {
    let ctx = BookContext::new(connect_and_create().await, None);
    let mut book = ctx.books().add(book("Draft")).await.expect("add book");

    book.title = "Final".to_string();
    book.publisher = Some("Manning".to_string());
    book.price = 49.99;
    ctx.books().update(&book).await.expect("update");

    let stored = ctx
        .books()
        .find(book.book_id)
        .await
        .expect("find")
        .expect("book exists");
    assert_eq!(stored, book);
}
