use crate::{
    command_arg_at,
    commands::{HandleCommandResult, Strings},
    reject_command,
    server::ClientState,
    storage::{ZSetAddMemberResult, ZSetDb, ZSetGetScoreResult, ZSetLenResult},
    to_number,
    types::{rank_range, Direction, LexRange, Limit, ScoreRange, ZAddFlags, ZAddOutcome},
    BytesMutUtils, RedisCommand, RedisCommandName, RespBuilder, SableError,
};

use bytes::BytesMut;
use std::rc::Rc;

/// Trailing options accepted by the range commands
#[derive(Default, Debug, Clone, Copy, PartialEq)]
struct RangeOptions {
    with_scores: bool,
    limit: Option<Limit>,
}

pub struct ZSetCommands {}

impl ZSetCommands {
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<HandleCommandResult, SableError> {
        let mut response_buffer = BytesMut::with_capacity(256);
        match command.metadata().name() {
            RedisCommandName::Zadd => {
                Self::zadd(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zcard => {
                Self::zcard(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zcount => {
                Self::zcount(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zincrby => {
                Self::zincrby(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zlexcount => {
                Self::zlexcount(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zrange => {
                Self::zrange(client_state, command, &mut response_buffer, false)?;
            }
            RedisCommandName::Zrevrange => {
                Self::zrange(client_state, command, &mut response_buffer, true)?;
            }
            RedisCommandName::Zrangebyscore => {
                Self::zrangebyscore(client_state, command, &mut response_buffer, false)?;
            }
            RedisCommandName::Zrevrangebyscore => {
                Self::zrangebyscore(client_state, command, &mut response_buffer, true)?;
            }
            RedisCommandName::Zrangebylex => {
                Self::zrangebylex(client_state, command, &mut response_buffer, false)?;
            }
            RedisCommandName::Zrevrangebylex => {
                Self::zrangebylex(client_state, command, &mut response_buffer, true)?;
            }
            RedisCommandName::Zrank => {
                Self::zrank(client_state, command, &mut response_buffer, Direction::Ascending)?;
            }
            RedisCommandName::Zrevrank => {
                Self::zrank(
                    client_state,
                    command,
                    &mut response_buffer,
                    Direction::Descending,
                )?;
            }
            RedisCommandName::Zrem => {
                Self::zrem(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zremrangebylex => {
                Self::zremrangebylex(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zremrangebyrank => {
                Self::zremrangebyrank(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zremrangebyscore => {
                Self::zremrangebyscore(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Zscore => {
                Self::zscore(client_state, command, &mut response_buffer)?;
            }
            _ => {
                return Err(SableError::InvalidArgument(format!(
                    "Non ZSet command {}",
                    command.main_command()
                )));
            }
        }
        Ok(HandleCommandResult::ResponseBufferUpdated(response_buffer))
    }

    /// Adds all the specified members with the specified scores to the sorted set stored at key.
    /// It is possible to specify multiple score / member pairs. Pairs are applied in argument
    /// order, so when a member is given more than once the last score wins (and the member is
    /// counted once)
    ///
    /// `ZADD key [NX | XX] [GT | LT] [CH] [INCR] score member [score member ...]`
    fn zadd(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();

        let mut flags = ZAddFlags::None;
        let mut pos = 2usize;
        while let Some(opt) = command.arg_as_lowercase_string(pos) {
            let flag = match opt.as_str() {
                "nx" => ZAddFlags::Nx,
                "xx" => ZAddFlags::Xx,
                "gt" => ZAddFlags::Gt,
                "lt" => ZAddFlags::Lt,
                "ch" => ZAddFlags::Ch,
                "incr" => ZAddFlags::Incr,
                _ => break,
            };
            flags.set(flag, true);
            pos = pos.saturating_add(1);
        }

        let pairs_args = &command.args_vec()[pos..];
        if pairs_args.is_empty() || pairs_args.len() % 2 != 0 {
            reject_command!(client_state, response_buffer, Strings::SYNTAX_ERROR);
        }

        if flags.contains(ZAddFlags::Incr) && pairs_args.len() > 2 {
            reject_command!(client_state, response_buffer, Strings::ZERR_INCR_SINGLE_PAIR);
        }

        if flags.contains(ZAddFlags::Nx | ZAddFlags::Xx) {
            reject_command!(client_state, response_buffer, Strings::ZERR_NX_XX);
        }

        if flags.contains(ZAddFlags::Lt | ZAddFlags::Gt)
            || (flags.contains(ZAddFlags::Nx) && flags.intersects(ZAddFlags::Lt | ZAddFlags::Gt))
        {
            reject_command!(client_state, response_buffer, Strings::ZERR_GT_LT_NX);
        }

        let mut pairs = Vec::<(f64, BytesMut)>::with_capacity(pairs_args.len() / 2);
        for pair in pairs_args.chunks(2) {
            let [score, member] = pair else {
                reject_command!(client_state, response_buffer, Strings::SYNTAX_ERROR);
            };
            let Some(score) = BytesMutUtils::parse_score(score) else {
                reject_command!(client_state, response_buffer, Strings::VALUE_NOT_VALID_FLOAT);
            };
            pairs.push((score, member.clone()));
        }

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let mut zset_db = ZSetDb::with_database(ctx.database()?);

            let mut added = 0usize;
            let mut updated = 0usize;
            let mut incr_score = None;
            for (score, member) in &pairs {
                let ZSetAddMemberResult::Some(outcome) = zset_db.add(&key, member, *score, flags)
                else {
                    return Err(SableError::WrongType);
                };

                incr_score = match outcome {
                    ZAddOutcome::Added(score) => {
                        added = added.saturating_add(1);
                        Some(score)
                    }
                    ZAddOutcome::Updated(score) => {
                        updated = updated.saturating_add(1);
                        Some(score)
                    }
                    ZAddOutcome::Unchanged(score) => Some(score),
                    ZAddOutcome::Skipped => None,
                    ZAddOutcome::NotANumber => {
                        builder.error_string(response_buffer, Strings::ZERR_SCORE_NAN);
                        return Ok(());
                    }
                };
            }

            if flags.contains(ZAddFlags::Incr) {
                match incr_score {
                    Some(score) => {
                        builder.bulk_string(response_buffer, &BytesMutUtils::from_score(score))
                    }
                    None => builder.null_string(response_buffer),
                }
            } else if flags.contains(ZAddFlags::Ch) {
                builder.number_usize(response_buffer, added.saturating_add(updated));
            } else {
                builder.number_usize(response_buffer, added);
            }
            Ok(())
        })
    }

    /// Returns the sorted set cardinality (number of elements) of the sorted set stored at key
    fn zcard(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            match zset_db.len(&key) {
                ZSetLenResult::Some(len) => {
                    builder.number_usize(response_buffer, len);
                }
                ZSetLenResult::WrongType => {
                    builder.error_string(response_buffer, Strings::WRONGTYPE);
                }
            }
            Ok(())
        })
    }

    /// Returns the number of elements in the sorted set at key with a score between min and max
    fn zcount(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let Some(range) =
            ScoreRange::from_tokens(command_arg_at!(command, 2), command_arg_at!(command, 3), false)
        else {
            reject_command!(client_state, response_buffer, Strings::ZERR_MIN_MAX_NOT_FLOAT);
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            let count = range.filter(zset_db.elements(&key)?).len();
            builder.number_usize(response_buffer, count);
            Ok(())
        })
    }

    /// Increments the score of member in the sorted set stored at key by increment
    fn zincrby(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let Some(increment) = BytesMutUtils::parse_score(command_arg_at!(command, 2)) else {
            reject_command!(client_state, response_buffer, Strings::VALUE_NOT_VALID_FLOAT);
        };
        let member = command_arg_at!(command, 3).clone();

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let mut zset_db = ZSetDb::with_database(ctx.database()?);
            match zset_db.add(&key, &member, increment, ZAddFlags::Incr) {
                ZSetAddMemberResult::WrongType => return Err(SableError::WrongType),
                ZSetAddMemberResult::Some(
                    ZAddOutcome::Added(score)
                    | ZAddOutcome::Updated(score)
                    | ZAddOutcome::Unchanged(score),
                ) => {
                    builder.bulk_string(response_buffer, &BytesMutUtils::from_score(score));
                }
                ZSetAddMemberResult::Some(ZAddOutcome::NotANumber) => {
                    builder.error_string(response_buffer, Strings::ZERR_SCORE_NAN);
                }
                ZSetAddMemberResult::Some(ZAddOutcome::Skipped) => {
                    builder.null_string(response_buffer);
                }
            }
            Ok(())
        })
    }

    /// Returns the number of elements in the sorted set at key with a value between min and
    /// max, comparing members bytewise
    fn zlexcount(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let Some(range) =
            LexRange::from_tokens(command_arg_at!(command, 2), command_arg_at!(command, 3), false)
        else {
            reject_command!(
                client_state,
                response_buffer,
                Strings::ZERR_MIN_MAX_NOT_STRING_RANGE
            );
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            let mut members = zset_db.members(&key)?;
            members.sort();
            builder.number_usize(response_buffer, range.filter(members).len());
            Ok(())
        })
    }

    /// `ZRANGE key start stop [WITHSCORES]` and `ZREVRANGE key start stop [WITHSCORES]`.
    /// For the reverse variant, ranks are counted on the reversed order
    fn zrange(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
        reverse: bool,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let start = to_number!(client_state, command_arg_at!(command, 2), i64, response_buffer);
        let stop = to_number!(client_state, command_arg_at!(command, 3), i64, response_buffer);

        if command.arg_count() > 5 {
            reject_command!(client_state, response_buffer, Strings::SYNTAX_ERROR);
        }
        let with_scores = match command.arg_as_lowercase_string(4) {
            None => false,
            Some(opt) if opt == "withscores" => true,
            Some(_) => {
                reject_command!(client_state, response_buffer, Strings::SYNTAX_ERROR);
            }
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            let mut elements = zset_db.elements(&key)?;
            if reverse {
                elements.reverse();
            }
            let (from, to) = rank_range(elements.len(), start, stop);
            let selected = elements.get(from..to).unwrap_or_default();
            Self::write_elements(&builder, response_buffer, selected, with_scores);
            Ok(())
        })
    }

    /// `ZRANGEBYSCORE key min max [WITHSCORES] [LIMIT offset count]` and
    /// `ZREVRANGEBYSCORE key max min [WITHSCORES] [LIMIT offset count]`
    fn zrangebyscore(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
        reverse: bool,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let Some(range) = ScoreRange::from_tokens(
            command_arg_at!(command, 2),
            command_arg_at!(command, 3),
            reverse,
        ) else {
            reject_command!(client_state, response_buffer, Strings::ZERR_MIN_MAX_NOT_FLOAT);
        };

        let options = match Self::parse_range_options(&command, true) {
            Ok(options) => options,
            Err(errmsg) => {
                reject_command!(client_state, response_buffer, errmsg);
            }
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            let mut elements = range.filter(zset_db.elements(&key)?);
            if reverse {
                elements.reverse();
            }
            if let Some(limit) = options.limit {
                elements = limit.apply(elements);
            }
            Self::write_elements(&builder, response_buffer, &elements, options.with_scores);
            Ok(())
        })
    }

    /// `ZRANGEBYLEX key min max [LIMIT offset count]` and
    /// `ZREVRANGEBYLEX key max min [LIMIT offset count]`.
    /// Members are compared bytewise, scores are ignored
    fn zrangebylex(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
        reverse: bool,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let Some(range) = LexRange::from_tokens(
            command_arg_at!(command, 2),
            command_arg_at!(command, 3),
            reverse,
        ) else {
            reject_command!(
                client_state,
                response_buffer,
                Strings::ZERR_MIN_MAX_NOT_STRING_RANGE
            );
        };

        let options = match Self::parse_range_options(&command, false) {
            Ok(options) => options,
            Err(errmsg) => {
                reject_command!(client_state, response_buffer, errmsg);
            }
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            let mut members = zset_db.members(&key)?;
            members.sort();
            let mut members = range.filter(members);
            if reverse {
                members.reverse();
            }
            if let Some(limit) = options.limit {
                members = limit.apply(members);
            }

            builder.add_array_len(response_buffer, members.len());
            for member in &members {
                builder.add_bulk_string(response_buffer, member);
            }
            Ok(())
        })
    }

    /// Returns the rank of member in the sorted set stored at key
    fn zrank(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
        direction: Direction,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let member = command_arg_at!(command, 2).clone();

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            match zset_db.rank(&key, &member, direction)? {
                Some(rank) => builder.number_usize(response_buffer, rank),
                None => builder.null_string(response_buffer),
            }
            Ok(())
        })
    }

    /// Removes the specified members from the sorted set stored at key. Non existing members
    /// are ignored
    fn zrem(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let members: Vec<BytesMut> = command.args_vec()[2..].to_vec();

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let mut zset_db = ZSetDb::with_database(ctx.database()?);
            let removed = zset_db.delete_members(&key, &members)?;
            builder.number_usize(response_buffer, removed);
            Ok(())
        })
    }

    /// Removes all elements in the sorted set stored at key between the lexicographical range
    /// specified by min and max
    fn zremrangebylex(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let Some(range) =
            LexRange::from_tokens(command_arg_at!(command, 2), command_arg_at!(command, 3), false)
        else {
            reject_command!(
                client_state,
                response_buffer,
                Strings::ZERR_MIN_MAX_NOT_STRING_RANGE
            );
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let mut zset_db = ZSetDb::with_database(ctx.database()?);
            let mut members = zset_db.members(&key)?;
            members.sort();
            let doomed = range.filter(members);

            let removed = zset_db.delete_members(&key, &doomed)?;
            builder.number_usize(response_buffer, removed);
            Ok(())
        })
    }

    /// Removes all elements in the sorted set stored at key with rank between start and stop
    fn zremrangebyrank(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let start = to_number!(client_state, command_arg_at!(command, 2), i64, response_buffer);
        let stop = to_number!(client_state, command_arg_at!(command, 3), i64, response_buffer);

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let mut zset_db = ZSetDb::with_database(ctx.database()?);
            let members = zset_db.members(&key)?;
            let (from, to) = rank_range(members.len(), start, stop);
            let doomed = members.get(from..to).unwrap_or_default().to_vec();

            let removed = zset_db.delete_members(&key, &doomed)?;
            builder.number_usize(response_buffer, removed);
            Ok(())
        })
    }

    /// Removes all elements in the sorted set stored at key with a score between min and max
    fn zremrangebyscore(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let Some(range) =
            ScoreRange::from_tokens(command_arg_at!(command, 2), command_arg_at!(command, 3), false)
        else {
            reject_command!(client_state, response_buffer, Strings::ZERR_MIN_MAX_NOT_FLOAT);
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let mut zset_db = ZSetDb::with_database(ctx.database()?);
            let doomed: Vec<BytesMut> = range
                .filter(zset_db.elements(&key)?)
                .into_iter()
                .map(|(member, _)| member)
                .collect();

            let removed = zset_db.delete_members(&key, &doomed)?;
            builder.number_usize(response_buffer, removed);
            Ok(())
        })
    }

    /// Returns the score of member in the sorted set at key
    fn zscore(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let member = command_arg_at!(command, 2).clone();

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            let zset_db = ZSetDb::with_database(ctx.database()?);
            match zset_db.get_score(&key, &member) {
                ZSetGetScoreResult::Score(score) => {
                    builder.bulk_string(response_buffer, &BytesMutUtils::from_score(score))
                }
                ZSetGetScoreResult::NotFound => builder.null_string(response_buffer),
                ZSetGetScoreResult::WrongType => return Err(SableError::WrongType),
            }
            Ok(())
        })
    }

    /// =========-------------------------------------
    /// Helper methods
    /// =========-------------------------------------

    /// Parse the `[WITHSCORES] [LIMIT offset count]` tail (starting at position 4).
    /// On error, return the message to reply with
    fn parse_range_options(
        command: &RedisCommand,
        accept_with_scores: bool,
    ) -> Result<RangeOptions, &'static str> {
        let mut options = RangeOptions::default();
        let mut pos = 4usize;
        while let Some(opt) = command.arg_as_lowercase_string(pos) {
            match opt.as_str() {
                "withscores" if accept_with_scores => {
                    options.with_scores = true;
                    pos = pos.saturating_add(1);
                }
                "limit" => {
                    let (Some(offset), Some(count)) = (
                        command.arg(pos.saturating_add(1)),
                        command.arg(pos.saturating_add(2)),
                    ) else {
                        return Err(Strings::SYNTAX_ERROR);
                    };
                    let (Some(offset), Some(count)) = (
                        BytesMutUtils::parse::<i64>(offset),
                        BytesMutUtils::parse::<i64>(count),
                    ) else {
                        return Err(Strings::VALUE_NOT_AN_INT_OR_OUT_OF_RANGE);
                    };
                    options.limit = Some(Limit { offset, count });
                    pos = pos.saturating_add(3);
                }
                _ => return Err(Strings::SYNTAX_ERROR),
            }
        }
        Ok(options)
    }

    /// Write `elements` as an array of members, optionally interleaved with their scores
    fn write_elements(
        builder: &RespBuilder,
        response_buffer: &mut BytesMut,
        elements: &[(BytesMut, f64)],
        with_scores: bool,
    ) {
        let len = if with_scores {
            elements.len().saturating_mul(2)
        } else {
            elements.len()
        };
        builder.add_array_len(response_buffer, len);
        for (member, score) in elements {
            builder.add_bulk_string(response_buffer, member);
            if with_scores {
                builder.add_bulk_string(response_buffer, &BytesMutUtils::from_score(*score));
            }
        }
    }
}
